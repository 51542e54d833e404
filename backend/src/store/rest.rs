//! PostgREST-style client for the hosted profile store.

use chrono::Utc;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use uagen_common::{Notification, Role};

use super::{NewNotification, ProfileStore, StoreError, StoreStats, STORE_TIMEOUT};
use crate::models::profile::{ProfilePatch, ProfileRecord};

/// Profile store client speaking the hosted database's REST dialect:
/// equality filters in the query string, `Prefer: return=representation`
/// for writes, exact counts via `Content-Range`, and stored procedures
/// under `/rpc/`.
pub struct RestProfileStore {
    client: Client,
    base_url: String,
    service_key: String,
}

impl RestProfileStore {
    pub fn new(base_url: &str, service_key: &str) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(STORE_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(RestProfileStore {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn rows<T: DeserializeOwned>(&self, resp: Response) -> Result<Vec<T>, StoreError> {
        let resp = check_status(resp).await?;
        resp.json().await.map_err(map_reqwest)
    }

    async fn single<T: DeserializeOwned>(&self, resp: Response) -> Result<T, StoreError> {
        self.rows(resp).await?.into_iter().next().ok_or(StoreError::NotFound)
    }

    async fn patch_single<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: serde_json::Value,
    ) -> Result<T, StoreError> {
        let mut req = self.client.patch(self.table_url(table));
        for (key, value) in filters {
            req = req.query(&[(*key, value.as_str())]);
        }
        let resp = self
            .authed(req)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest)?;
        self.single(resp).await
    }

    async fn count_where(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<u64, StoreError> {
        let mut req = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "id")]);
        for (key, value) in filters {
            req = req.query(&[(*key, value.as_str())]);
        }
        let resp = self
            .authed(req)
            .header("Prefer", "count=exact")
            .header(header::RANGE, "0-0")
            .send()
            .await
            .map_err(map_reqwest)?;
        let resp = check_status(resp).await?;

        let content_range = resp
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::Backend("missing Content-Range header".to_string()))?;
        parse_total(content_range)
            .ok_or_else(|| StoreError::Backend(format!("bad Content-Range: {content_range}")))
    }
}

/// Extract the total row count from a `Content-Range` value like `0-0/57`.
fn parse_total(content_range: &str) -> Option<u64> {
    content_range.rsplit('/').next()?.parse().ok()
}

fn map_reqwest(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Backend(err.to_string())
    }
}

async fn check_status(resp: Response) -> Result<Response, StoreError> {
    match resp.status() {
        status if status.is_success() => Ok(resp),
        StatusCode::CONFLICT => Err(StoreError::Conflict),
        status => {
            let body = resp.text().await.unwrap_or_default();
            Err(StoreError::Backend(format!("{status}: {body}")))
        }
    }
}

#[async_trait::async_trait]
impl ProfileStore for RestProfileStore {
    async fn fetch_by_identity(
        &self,
        identity_uid: &str,
    ) -> Result<Option<ProfileRecord>, StoreError> {
        let req = self
            .client
            .get(self.table_url("users"))
            .query(&[
                ("select", "*".to_string()),
                ("identity_uid", format!("eq.{identity_uid}")),
            ]);
        let resp = self.authed(req).send().await.map_err(map_reqwest)?;
        Ok(self.rows(resp).await?.into_iter().next())
    }

    async fn create_for_session(&self, patch: &ProfilePatch) -> Result<ProfileRecord, StoreError> {
        // The register_profile function claims bootstrap admin atomically
        // when the table is empty; a duplicate identity_uid surfaces as a
        // unique violation (409).
        let resp = self
            .authed(self.client.post(self.rpc_url("register_profile")))
            .json(&json!({
                "p_identity_uid": patch.identity_uid,
                "p_email": patch.email,
                "p_display_name": patch.display_name,
                "p_email_verified": patch.email_verified,
                "p_last_login": patch.last_login,
            }))
            .send()
            .await
            .map_err(map_reqwest)?;
        let record: ProfileRecord = check_status(resp).await?.json().await.map_err(map_reqwest)?;
        tracing::info!(
            identity_uid = %record.identity_uid,
            role = ?record.role,
            approved = record.is_approved,
            "created profile row"
        );
        Ok(record)
    }

    async fn refresh_mirrored(&self, patch: &ProfilePatch) -> Result<ProfileRecord, StoreError> {
        self.patch_single(
            "users",
            &[("identity_uid", format!("eq.{}", patch.identity_uid))],
            json!({
                "email": patch.email,
                "display_name": patch.display_name,
                "email_verified": patch.email_verified,
                "last_login": patch.last_login,
            }),
        )
        .await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.count_where("users", &[]).await
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<ProfileRecord>, StoreError> {
        let req = self
            .client
            .get(self.table_url("users"))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]);
        let resp = self.authed(req).send().await.map_err(map_reqwest)?;
        Ok(self.rows(resp).await?.into_iter().next())
    }

    async fn list_users(&self) -> Result<Vec<ProfileRecord>, StoreError> {
        let req = self
            .client
            .get(self.table_url("users"))
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        let resp = self.authed(req).send().await.map_err(map_reqwest)?;
        self.rows(resp).await
    }

    async fn list_pending(&self) -> Result<Vec<ProfileRecord>, StoreError> {
        let req = self.client.get(self.table_url("users")).query(&[
            ("select", "*"),
            ("is_approved", "eq.false"),
            ("order", "created_at.desc"),
        ]);
        let resp = self.authed(req).send().await.map_err(map_reqwest)?;
        self.rows(resp).await
    }

    async fn set_approval(&self, id: Uuid, approved: bool) -> Result<ProfileRecord, StoreError> {
        self.patch_single(
            "users",
            &[("id", format!("eq.{id}"))],
            json!({ "is_approved": approved }),
        )
        .await
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<ProfileRecord, StoreError> {
        self.patch_single("users", &[("id", format!("eq.{id}"))], json!({ "role": role }))
            .await
    }

    async fn set_agent_limit(
        &self,
        id: Uuid,
        limit: i64,
        custom: bool,
    ) -> Result<ProfileRecord, StoreError> {
        self.patch_single(
            "users",
            &[("id", format!("eq.{id}"))],
            json!({ "agent_limit": limit, "custom_limit": custom }),
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let req = self
            .client
            .delete(self.table_url("users"))
            .query(&[("id", format!("eq.{id}"))]);
        let resp = self.authed(req).send().await.map_err(map_reqwest)?;
        check_status(resp).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let today = format!("gte.{}T00:00:00Z", Utc::now().format("%Y-%m-%d"));
        let total_users = self.count_where("users", &[]).await?;
        let pending_approvals = self
            .count_where("users", &[("is_approved", "eq.false".to_string())])
            .await?;
        let approved_users = self
            .count_where("users", &[("is_approved", "eq.true".to_string())])
            .await?;
        let active_today = self.count_where("users", &[("last_login", today)]).await?;
        Ok(StoreStats {
            total_users,
            pending_approvals,
            approved_users,
            active_today,
        })
    }

    async fn insert_notification(
        &self,
        new: &NewNotification,
    ) -> Result<Notification, StoreError> {
        let resp = self
            .authed(self.client.post(self.table_url("notifications")))
            .header("Prefer", "return=representation")
            .json(new)
            .send()
            .await
            .map_err(map_reqwest)?;
        self.single(resp).await
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Notification>, StoreError> {
        let req = self.client.get(self.table_url("notifications")).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ]);
        let resp = self.authed(req).send().await.map_err(map_reqwest)?;
        self.rows(resp).await
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let req = self
            .client
            .patch(self.table_url("notifications"))
            .query(&[("id", format!("eq.{id}")), ("user_id", format!("eq.{user_id}"))]);
        let resp = self
            .authed(req)
            .json(&json!({ "is_read": true }))
            .send()
            .await
            .map_err(map_reqwest)?;
        check_status(resp).await?;
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<(), StoreError> {
        let req = self.client.patch(self.table_url("notifications")).query(&[
            ("user_id", format!("eq.{user_id}")),
            ("is_read", "eq.false".to_string()),
        ]);
        let resp = self
            .authed(req)
            .json(&json!({ "is_read": true }))
            .send()
            .await
            .map_err(map_reqwest)?;
        check_status(resp).await?;
        Ok(())
    }

    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let req = self
            .client
            .delete(self.table_url("notifications"))
            .query(&[("id", format!("eq.{id}")), ("user_id", format!("eq.{user_id}"))]);
        let resp = self.authed(req).send().await.map_err(map_reqwest)?;
        check_status(resp).await?;
        Ok(())
    }
}
