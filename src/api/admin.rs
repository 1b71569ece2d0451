use serde::Serialize;

// ==================== make-admin ====================

#[derive(Debug, Serialize)]
pub struct MakeAdminResponse {
    pub status: &'static str,
    pub uid: String,
}
