use std::sync::Arc;
use std::time::Instant;

use sea_orm::DatabaseConnection;
use tokio::sync::RwLock;

use suficiencia_auth_types::token::TokenService;
use suficiencia_domain::pagination::PageRequest;

use crate::domain::types::SystemSettings;
use crate::infra::course_db::{DbAssignmentRepository, DbCourseRepository, DbEnrollmentRepository};
use crate::infra::db::{DbSessionRepository, DbStatsRepository, DbUserRepository};
use crate::infra::exam_db::DbExamScheduleRepository;
use crate::infra::identity::{Directory, HttpIdentityProvider, LocalIdentityProvider};

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub tokens: Arc<TokenService>,
    pub api_key: Arc<str>,
    pub settings: Arc<RwLock<SystemSettings>>,
    /// External identity directory; local password check when `None`.
    pub identity: Option<HttpIdentityProvider>,
    pub started_at: Instant,
    pub environment: Arc<str>,
    pub bcrypt_cost: u32,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl AppState {
    pub fn session_repo(&self) -> DbSessionRepository {
        DbSessionRepository {
            db: self.db.clone(),
        }
    }

    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn course_repo(&self) -> DbCourseRepository {
        DbCourseRepository {
            db: self.db.clone(),
        }
    }

    pub fn enrollment_repo(&self) -> DbEnrollmentRepository {
        DbEnrollmentRepository {
            db: self.db.clone(),
        }
    }

    pub fn assignment_repo(&self) -> DbAssignmentRepository {
        DbAssignmentRepository {
            db: self.db.clone(),
        }
    }

    pub fn exam_repo(&self) -> DbExamScheduleRepository {
        DbExamScheduleRepository {
            db: self.db.clone(),
        }
    }

    pub fn stats_repo(&self) -> DbStatsRepository {
        DbStatsRepository {
            db: self.db.clone(),
        }
    }

    pub fn identity_provider(&self) -> Directory {
        match &self.identity {
            Some(http) => Directory::Http(http.clone()),
            None => Directory::Local(LocalIdentityProvider {
                db: self.db.clone(),
            }),
        }
    }

    /// Page request from query values, clamped to the configured maximum.
    pub fn page(&self, page: Option<u32>, limit: Option<u32>) -> PageRequest {
        PageRequest::from_query(page, limit, self.default_page_size).clamped_to(self.max_page_size)
    }
}
