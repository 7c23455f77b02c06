//! PanelClient
//!
//! Typed wrappers over [`RequestDispatcher`] for the panel endpoints the bot
//! consumes. Each call goes through the dispatcher, so every one of them is
//! subject to the shared cooldown.

use super::dispatcher::RequestDispatcher;
use super::mods::{plan_mod_toggle, ModAction, ModTogglePlan, WildcardPattern};
use super::pagination::PaginatedFetcher;
use super::types::{
    Announcement, FileEntry, ListEnvelope, PanelRequest, PanelResponse, Player, PowerSignal,
    RemoteServer, RenameEntry, Resource, ResourceUsage, ServerDetails, SignedUrl,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Panel API client
#[derive(Clone)]
pub struct PanelClient {
    dispatcher: Arc<RequestDispatcher>,
}

impl PanelClient {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<RequestDispatcher> {
        &self.dispatcher
    }

    fn pages(&self) -> PaginatedFetcher<'_> {
        PaginatedFetcher::new(&self.dispatcher)
    }

    async fn get_resource<T: DeserializeOwned>(&self, request: PanelRequest) -> crate::Result<T> {
        let path = request.path.clone();
        let resource: Resource<T> = self.dispatcher.execute(request).await?.decode()?;
        resource
            .attributes
            .ok_or_else(|| crate::Error::NotFound(format!("no attributes in response from {}", path)))
    }

    async fn get_list<T: DeserializeOwned>(&self, request: PanelRequest) -> crate::Result<Vec<T>> {
        let envelope: ListEnvelope<T> = self.dispatcher.execute(request).await?.decode()?;
        Ok(envelope.into_items())
    }

    // ========================================
    // Servers
    // ========================================

    /// Every server the API key can see
    pub async fn list_servers(&self) -> crate::Result<Vec<RemoteServer>> {
        self.pages().fetch_all("/").await
    }

    pub async fn server_details(&self, server_id: &str) -> crate::Result<ServerDetails> {
        self.get_resource(PanelRequest::get(format!("/servers/{}", server_id)))
            .await
    }

    pub async fn resources(&self, server_id: &str) -> crate::Result<ResourceUsage> {
        self.get_resource(PanelRequest::get(format!("/servers/{}/resources", server_id)))
            .await
    }

    pub async fn send_power(
        &self,
        server_id: &str,
        signal: PowerSignal,
    ) -> crate::Result<PanelResponse> {
        let response = self
            .dispatcher
            .execute(PanelRequest::post(
                format!("/servers/{}/power", server_id),
                json!({ "signal": signal }),
            ))
            .await?;
        info!(server_id = %server_id, signal = signal.as_str(), "Power action sent");
        Ok(response)
    }

    pub async fn send_command(&self, server_id: &str, command: &str) -> crate::Result<PanelResponse> {
        let response = self
            .dispatcher
            .execute(PanelRequest::post(
                format!("/servers/{}/command", server_id),
                json!({ "command": command }),
            ))
            .await?;
        info!(server_id = %server_id, command = %command, "Console command sent");
        Ok(response)
    }

    // ========================================
    // Files
    // ========================================

    pub async fn list_directory(&self, server_id: &str, directory: &str) -> crate::Result<Vec<FileEntry>> {
        self.get_list(
            PanelRequest::get(format!("/servers/{}/files/list", server_id))
                .with_query("directory", directory),
        )
        .await
    }

    pub async fn rename_files(
        &self,
        server_id: &str,
        root: &str,
        files: &[RenameEntry],
    ) -> crate::Result<PanelResponse> {
        Ok(self
            .dispatcher
            .execute(PanelRequest::put(
                format!("/servers/{}/files/rename", server_id),
                json!({ "root": root, "files": files }),
            ))
            .await?)
    }

    /// Signed, short-lived URL for a server file
    pub async fn download_url(&self, server_id: &str, file: &str) -> crate::Result<String> {
        let signed: SignedUrl = self
            .get_resource(
                PanelRequest::get(format!("/servers/{}/files/download", server_id))
                    .with_query("file", file),
            )
            .await?;
        signed
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| crate::Error::NotFound(format!("no signed URL for {}", file)))
    }

    /// Resolve the signed URL and fetch the file contents
    pub async fn download_file(&self, server_id: &str, file: &str) -> crate::Result<Vec<u8>> {
        let url = self.download_url(server_id, file).await?;
        info!(server_id = %server_id, file = %file, "Downloading server file");
        Ok(self.dispatcher.download(&url).await?)
    }

    /// Enable or disable every mod file in `mods_dir` matching `pattern`
    pub async fn toggle_mods(
        &self,
        server_id: &str,
        mods_dir: &str,
        pattern: &str,
        action: ModAction,
    ) -> crate::Result<ModTogglePlan> {
        let pattern = WildcardPattern::new(pattern)?;
        let mods_dir = mods_dir.trim_matches('/');
        let files = self
            .list_directory(server_id, &format!("/{}", mods_dir))
            .await?;

        let plan = plan_mod_toggle(&files, mods_dir, &pattern, action);
        if !plan.renames.is_empty() {
            self.rename_files(server_id, "/", &plan.renames).await?;
            info!(
                server_id = %server_id,
                action = ?action,
                count = plan.renames.len(),
                "Mods renamed"
            );
        }
        Ok(plan)
    }

    // ========================================
    // Players / Announcements
    // ========================================

    /// Full roster across all pages
    pub async fn players(&self, server_id: &str) -> crate::Result<Vec<Player>> {
        self.pages()
            .fetch_all(&format!("/servers/{}/player", server_id))
            .await
    }

    pub async fn delete_player(&self, server_id: &str, player_id: &str) -> crate::Result<PanelResponse> {
        let response = self
            .dispatcher
            .execute(PanelRequest::delete(format!(
                "/servers/{}/player/{}",
                server_id, player_id
            )))
            .await?;
        info!(server_id = %server_id, player_id = %player_id, "Player deleted");
        Ok(response)
    }

    pub async fn announcements(&self, server_id: &str) -> crate::Result<Vec<Announcement>> {
        self.get_list(PanelRequest::get(format!(
            "/servers/{}/announcements",
            server_id
        )))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel_client::PanelError;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PanelClient {
        PanelClient::new(Arc::new(RequestDispatcher::new(server.uri(), "key")))
    }

    #[tokio::test]
    async fn test_resources_decode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers/abc/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "attributes": {
                    "current_state": "running",
                    "resources": {"memory_bytes": 2147483648u64, "cpu_absolute": 12.5, "disk_bytes": 0}
                }
            })))
            .mount(&server)
            .await;

        let usage = client(&server).resources("abc").await.unwrap();
        assert!(usage.is_running());
        assert!((usage.memory_gib() - 2.0).abs() < f64::EPSILON);
        assert_eq!(usage.resources.cpu_absolute, 12.5);
    }

    #[tokio::test]
    async fn test_power_sends_signal_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/servers/abc/power"))
            .and(body_json(json!({"signal": "restart"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .send_power("abc", PowerSignal::Restart)
            .await
            .unwrap();
        assert_eq!(response, PanelResponse::NoContent);
    }

    #[tokio::test]
    async fn test_download_file_follows_signed_url() {
        let server = MockServer::start().await;
        let signed = format!("{}/signed/latest.log", server.uri());
        Mock::given(method("GET"))
            .and(path("/servers/abc/files/download"))
            .and(query_param("file", "logs/latest.log"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"attributes": {"url": signed}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/signed/latest.log"))
            .respond_with(ResponseTemplate::new(200).set_body_string("line one\n"))
            .mount(&server)
            .await;

        let bytes = client(&server)
            .download_file("abc", "logs/latest.log")
            .await
            .unwrap();
        assert_eq!(bytes, b"line one\n");
    }

    #[tokio::test]
    async fn test_missing_signed_url_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers/abc/files/download"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"attributes": {}})))
            .mount(&server)
            .await;

        let err = client(&server)
            .download_url("abc", "missing.log")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_toggle_mods_submits_rename_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers/abc/files/list"))
            .and(query_param("directory", "/mods"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"attributes": {"name": "jei.jar", "is_file": true}},
                    {"attributes": {"name": "jei-config", "is_file": false}}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/servers/abc/files/rename"))
            .and(body_json(json!({
                "root": "/",
                "files": [{"from": "mods/jei.jar", "to": "mods/jei.jar.disabled"}]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let plan = client(&server)
            .toggle_mods("abc", "mods", "jei*", ModAction::Disable)
            .await
            .unwrap();
        assert_eq!(plan.affected, vec!["jei.jar".to_string()]);
        assert_eq!(plan.skipped_folders, vec!["jei-config".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_player_surfaces_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/servers/abc/player/9"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = client(&server).delete_player("abc", "9").await.unwrap_err();
        assert!(matches!(
            err.as_panel(),
            Some(PanelError::HardFailure { status: 403, .. })
        ));
    }
}
