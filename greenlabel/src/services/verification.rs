use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use super::branches::{
    CatalogBranch, LogoBranch, RegistryRecordBranch, VerificationBranch, VerificationInput,
};
use super::writes::{persistence_error, BackgroundWrites};
use crate::config::Config;
use crate::db::ProductStore;
use crate::error::{GreenlabelError, Result};
use crate::models::{BranchOutcome, VerificationStatus, VerificationVerdict};
use crate::ocr::OcrProvider;
use crate::search::normalize_barcode;
use crate::sources::CatalogClient;

const ORGANIC_MESSAGE: &str = "Product is certified organic";
const NOT_ORGANIC_MESSAGE: &str = "Product not certified as organic";

/// Fold branch outcomes into one verdict.
///
/// Organic is the OR of all contributions and the percentage their maximum,
/// so the result does not depend on the order branches finished in.
/// Failed and empty branches are skipped; if nothing contributed the verdict
/// is [`VerificationVerdict::unavailable`] rather than a plain negative.
pub fn merge_outcomes(outcomes: &[BranchOutcome]) -> VerificationVerdict {
    let mut verdict = VerificationVerdict::default();

    for outcome in outcomes {
        let BranchOutcome::Contributed(contribution) = outcome else {
            continue;
        };
        verdict.is_organic |= contribution.organic;
        verdict.percentage = verdict.percentage.max(contribution.percentage);
        verdict.sources.insert(contribution.source.clone());
        verdict.details.push(contribution.clone());
    }

    if verdict.details.is_empty() {
        return VerificationVerdict::unavailable();
    }

    verdict.status = VerificationStatus::Verified;
    verdict.message = Some(
        if verdict.is_organic {
            ORGANIC_MESSAGE
        } else {
            NOT_ORGANIC_MESSAGE
        }
        .to_string(),
    );
    verdict
}

/// Runs every verification branch concurrently and merges what comes back.
#[derive(Clone)]
pub struct VerificationService {
    branches: Vec<Arc<dyn VerificationBranch>>,
    store: Arc<dyn ProductStore>,
    branch_timeout: Duration,
    writes: BackgroundWrites,
}

impl VerificationService {
    pub fn new(
        branches: Vec<Arc<dyn VerificationBranch>>,
        store: Arc<dyn ProductStore>,
        branch_timeout: Duration,
    ) -> Self {
        Self {
            branches,
            store,
            branch_timeout,
            writes: BackgroundWrites::new(),
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn ProductStore>,
        catalog: Arc<CatalogClient>,
        ocr: OcrProvider,
    ) -> Self {
        let branches: Vec<Arc<dyn VerificationBranch>> = vec![
            Arc::new(CatalogBranch::new(catalog)),
            Arc::new(RegistryRecordBranch::new(store.clone())),
            Arc::new(LogoBranch::new(ocr, config.imaging.clone())),
        ];
        Self::new(
            branches,
            store,
            Duration::from_secs(config.verification.branch_timeout_secs),
        )
    }

    pub async fn verify(
        &self,
        barcode: Option<&str>,
        image: Option<Vec<u8>>,
    ) -> Result<VerificationVerdict> {
        let barcode = barcode
            .map(normalize_barcode)
            .filter(|b| !b.is_empty());
        let image = image.filter(|bytes| !bytes.is_empty()).map(Arc::new);

        if barcode.is_none() && image.is_none() {
            return Err(GreenlabelError::InvalidArgument(
                "A barcode or an image is required for verification".to_string(),
            ));
        }

        let input = VerificationInput { barcode, image };
        let outcomes = join_all(
            self.branches
                .iter()
                .map(|branch| self.run_branch(branch, &input)),
        )
        .await;

        let verdict = merge_outcomes(&outcomes);
        tracing::info!(
            barcode = ?input.barcode,
            status = %verdict.status,
            is_organic = verdict.is_organic,
            percentage = verdict.percentage,
            sources = ?verdict.sources,
            "Verification complete"
        );

        if verdict.is_verified() {
            if let Some(barcode) = input.barcode {
                let store = self.store.clone();
                let cached = verdict.clone();
                self.writes.spawn("verification verdict", async move {
                    cache_on_record(store.as_ref(), &barcode, cached).await
                });
            }
        }

        Ok(verdict)
    }

    /// Wait for verdicts still being written to their records.
    pub async fn flush_pending(&self) {
        self.writes.flush().await;
    }

    async fn run_branch(
        &self,
        branch: &Arc<dyn VerificationBranch>,
        input: &VerificationInput,
    ) -> BranchOutcome {
        let outcome = match tokio::time::timeout(self.branch_timeout, branch.run(input)).await {
            Ok(outcome) => outcome,
            Err(_) => BranchOutcome::Failed(format!(
                "timed out after {}s",
                self.branch_timeout.as_secs()
            )),
        };

        if let BranchOutcome::Failed(reason) = &outcome {
            tracing::warn!(branch = branch.name(), reason = %reason, "Verification branch failed");
        }
        outcome
    }
}

/// Attach the verdict to the stored record for this barcode, if any.
async fn cache_on_record(
    store: &dyn ProductStore,
    barcode: &str,
    verdict: VerificationVerdict,
) -> Result<()> {
    let Some(mut record) = store.find_by_barcode(barcode).await? else {
        return Ok(());
    };

    record.verification = Some(verdict);
    record.updated_at = chrono::Utc::now();
    store.save(&record).await.map_err(persistence_error)?;
    tracing::debug!(barcode, id = %record.id, "Verdict cached on product");
    Ok(())
}
