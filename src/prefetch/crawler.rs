//! Recursive prefetch traversal
//!
//! Lists a path, reports it, and when recursion is accepted descends into
//! directory children concurrently while proposing file children. Backend
//! failures are logged and stay local to the path that failed.

use super::{PrefetchNodeDataContext, PrefetchProposedPathItem, ProposalOutcome};
use crate::backend::{BackendChildEntry, BackendLister, BackendListing, BackendRecord, PageCursor};
use crate::error::BackendError;
use crate::types::{NodeNamesPath, NodeType};
use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Summary of one traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    /// Paths listed against the backend
    pub listed: usize,
    /// Listing pages fetched, across all paths
    pub pages: usize,
    /// Records handed to the context
    pub reported: usize,
    pub proposals_completed: usize,
    pub proposals_ignored: usize,
    pub proposals_deferred: usize,
    pub proposals_failed: usize,
    /// Listings that failed
    pub errors: usize,
    /// Branches stopped by an accept check
    pub budget_stops: usize,
    pub duration_ms: u64,
}

/// File child proposed from a listing
struct BackendProposedItem<L> {
    path: NodeNamesPath,
    /// Record already carried by the listing, if any
    record: Option<BackendRecord>,
    lister: Arc<L>,
    semaphore: Arc<Semaphore>,
}

#[async_trait]
impl<L: BackendLister + 'static> PrefetchProposedPathItem<BackendRecord> for BackendProposedItem<L> {
    fn path(&self) -> &NodeNamesPath {
        &self.path
    }

    fn node_type_hint(&self) -> Option<NodeType> {
        Some(NodeType::File)
    }

    async fn complete(&self) -> Result<BackendRecord, BackendError> {
        if let Some(record) = &self.record {
            return Ok(record.clone());
        }
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| BackendError::ListingFailed("prefetch semaphore closed".to_string()))?;
        self.lister.stat(&self.path).await
    }
}

pub struct PrefetchCrawler<L> {
    lister: Arc<L>,
    semaphore: Arc<Semaphore>,
}

impl<L: BackendLister + 'static> PrefetchCrawler<L> {
    pub fn new(lister: Arc<L>, max_concurrent_listings: usize) -> Self {
        Self {
            lister,
            semaphore: Arc::new(Semaphore::new(max_concurrent_listings.max(1))),
        }
    }

    pub fn lister(&self) -> &Arc<L> {
        &self.lister
    }

    /// Prefetch `path` and, budget permitting, its subtree
    pub async fn prefetch(
        &self,
        path: &NodeNamesPath,
        ctx: Arc<dyn PrefetchNodeDataContext<BackendRecord>>,
    ) -> PrefetchReport {
        let start = Instant::now();
        let report = Arc::new(Mutex::new(PrefetchReport::default()));

        self.visit(path.clone(), ctx, Arc::clone(&report)).await;

        let mut report = report.lock().clone();
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            path = %path,
            listed = report.listed,
            reported = report.reported,
            completed = report.proposals_completed,
            errors = report.errors,
            budget_stops = report.budget_stops,
            duration_ms = report.duration_ms,
            "Prefetch finished"
        );
        report
    }

    fn visit<'a>(
        &'a self,
        path: NodeNamesPath,
        ctx: Arc<dyn PrefetchNodeDataContext<BackendRecord>>,
        report: Arc<Mutex<PrefetchReport>>,
    ) -> BoxFuture<'a, ()> {
        async move {
            if !ctx.accept_prefetch_node_datas() {
                report.lock().budget_stops += 1;
                return;
            }

            let (record, children, is_incomplete) =
                match self.list_all_pages(&path, &ctx, &report).await {
                    Some(listing) => listing,
                    None => return,
                };
            report.lock().listed += 1;

            let is_dir = record.node_type == NodeType::Dir;
            ctx.incr_prefetch_count(1);
            ctx.on_prefetch_node_data(&path, record, is_incomplete);
            report.lock().reported += 1;

            if !is_dir || children.is_empty() {
                return;
            }
            if !ctx.accept_recurse_propose_prefetch_path_items() {
                debug!(path = %path, "Not recursing: budget or depth reached");
                report.lock().budget_stops += 1;
                return;
            }

            let child_ctx = ctx.create_child_prefetch_context();
            let mut branches: Vec<BoxFuture<'a, ()>> = Vec::with_capacity(children.len());
            for child in children {
                let child_path = path.child(child.name.clone());
                match child.node_type {
                    NodeType::Dir => {
                        branches.push(self.visit(child_path, Arc::clone(&child_ctx), Arc::clone(&report)));
                    }
                    NodeType::File => {
                        let item = Arc::new(BackendProposedItem {
                            path: child_path,
                            record: child.record,
                            lister: Arc::clone(&self.lister),
                            semaphore: Arc::clone(&self.semaphore),
                        });
                        branches.push(Self::propose(item, Arc::clone(&child_ctx), Arc::clone(&report)));
                    }
                }
            }
            join_all(branches).await;
        }
        .boxed()
    }

    /// List every page of `path`
    ///
    /// Each page but the last is reported as an incomplete fragment as soon as
    /// it arrives. The returned record carries the child names of all pages,
    /// and is still incomplete when paging stopped early on the budget or the
    /// backend truncated without a cursor. `None` when the first page failed.
    async fn list_all_pages(
        &self,
        path: &NodeNamesPath,
        ctx: &Arc<dyn PrefetchNodeDataContext<BackendRecord>>,
        report: &Arc<Mutex<PrefetchReport>>,
    ) -> Option<(BackendRecord, Vec<BackendChildEntry>, bool)> {
        let mut listing = match self.list_page(path, None).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(path = %path, error = %e, "Backend listing failed");
                report.lock().errors += 1;
                return None;
            }
        };
        report.lock().pages += 1;

        let mut child_names = listing.record.child_names.clone();
        let mut children = std::mem::take(&mut listing.children);
        while let Some(cursor) = listing.next_page.take() {
            ctx.on_prefetch_node_data(path, listing.record.clone(), true);
            if !ctx.accept_prefetch_node_datas() {
                debug!(path = %path, "Paging stopped: budget reached");
                report.lock().budget_stops += 1;
                listing.is_incomplete = true;
                break;
            }
            match self.list_page(path, Some(&cursor)).await {
                Ok(mut page) => {
                    report.lock().pages += 1;
                    child_names.extend(page.record.child_names.iter().cloned());
                    children.append(&mut page.children);
                    listing = page;
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Backend listing page failed");
                    report.lock().errors += 1;
                    listing.is_incomplete = true;
                    break;
                }
            }
        }

        let mut record = listing.record;
        record.child_names = child_names;
        Some((record, children, listing.is_incomplete))
    }

    async fn list_page(
        &self,
        path: &NodeNamesPath,
        cursor: Option<&PageCursor>,
    ) -> Result<BackendListing, BackendError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| BackendError::ListingFailed("prefetch semaphore closed".to_string()))?;
        self.lister.list_page(path, cursor).await
    }

    fn propose<'a>(
        item: Arc<BackendProposedItem<L>>,
        ctx: Arc<dyn PrefetchNodeDataContext<BackendRecord>>,
        report: Arc<Mutex<PrefetchReport>>,
    ) -> BoxFuture<'a, ()> {
        async move {
            let outcome = ctx.on_propose_prefetch_path_item(item).await;
            if outcome == ProposalOutcome::Completed {
                ctx.incr_prefetch_count(1);
            }
            let mut report = report.lock();
            match outcome {
                ProposalOutcome::Completed => {
                    report.proposals_completed += 1;
                    report.reported += 1;
                }
                ProposalOutcome::Ignored => report.proposals_ignored += 1,
                ProposalOutcome::Deferred => report.proposals_deferred += 1,
                ProposalOutcome::Failed => report.proposals_failed += 1,
            }
        }
        .boxed()
    }
}
