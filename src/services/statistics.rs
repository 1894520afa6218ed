//! Statistics operations.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::MailResult;
use crate::http::{MailHttpClient, MailRequest};
use crate::types::{Statistics, StatisticsKind, StatisticsQuery};

use super::path_segment;

/// Service for delivery statistics.
///
/// Statistics endpoints have their own, much tighter, rate limit.
#[derive(Debug, Clone)]
pub struct StatisticsService {
    http: Arc<MailHttpClient>,
}

impl StatisticsService {
    /// Create a new statistics service.
    pub fn new(http: Arc<MailHttpClient>) -> Self {
        Self { http }
    }

    /// Bounce statistics.
    pub async fn bounces(&self, query: &StatisticsQuery, cancel: &CancellationToken) -> MailResult<Statistics> {
        self.fetch(StatisticsKind::Bounces, query, cancel).await
    }

    /// Delivery statistics.
    pub async fn deliveries(&self, query: &StatisticsQuery, cancel: &CancellationToken) -> MailResult<Statistics> {
        self.fetch(StatisticsKind::Deliveries, query, cancel).await
    }

    /// Open statistics.
    pub async fn opens(&self, query: &StatisticsQuery, cancel: &CancellationToken) -> MailResult<Statistics> {
        self.fetch(StatisticsKind::Opens, query, cancel).await
    }

    /// Fetch any statistic.
    pub async fn fetch(
        &self,
        kind: StatisticsKind,
        query: &StatisticsQuery,
        cancel: &CancellationToken,
    ) -> MailResult<Statistics> {
        let account = path_segment("account id", &self.http.config().account_id)?;
        let request = MailRequest::get(format!("/v2/accounts/{}/statistics/{}", account, kind.as_str()))
            .query_opt("from", query.from.map(|t| t.to_rfc3339()))
            .query_opt("to", query.to.map(|t| t.to_rfc3339()))
            .query_opt("tag", query.tag.as_deref());

        self.http.execute_json(request, cancel).await
    }
}
