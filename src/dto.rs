use serde::{Deserialize, Serialize};

use crate::db::Page;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub ini: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 { 10 }

impl Pagination {
    pub fn page(&self) -> AppResult<Page> {
        if self.ini < 0 {
            return Err(AppError::validation("invalid ini"));
        }
        if self.limit < 0 {
            return Err(AppError::validation("invalid limit"));
        }
        Ok(Page {
            offset: self.ini,
            limit: self.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_api() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.page().unwrap(), Page { offset: 0, limit: 10 });
    }

    #[test]
    fn rejects_negative_window() {
        let p = Pagination { ini: -1, limit: 10 };
        assert!(matches!(p.page(), Err(AppError::Validation(_))));
        let p = Pagination { ini: 0, limit: -5 };
        assert!(matches!(p.page(), Err(AppError::Validation(_))));
    }
}
