use uuid::Uuid;

use suficiencia_domain::pagination::{Page, PageRequest};
use suficiencia_domain::role::{Role, RoleSet};

use crate::domain::repository::{AssignmentRepository, EnrollmentRepository, UserRepository};
use crate::domain::types::{
    NewUser, User, UserAssignment, UserEnrollment, UserFilter, UserPatch, non_blank,
    normalize_email, validate_email,
};
use crate::error::ApiError;
use crate::infra::password::hash_password;
use crate::usecase::auth::validate_identity;

// ── GetUser ──────────────────────────────────────────────────────────────────

pub struct GetUserUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> GetUserUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<User, ApiError> {
        self.repo.find_by_id(id).await?.ok_or(ApiError::UserNotFound)
    }
}

// ── UpdateProfile ────────────────────────────────────────────────────────────

pub struct UpdateProfileInput {
    pub nombres: Option<String>,
    pub apellidos: Option<String>,
}

pub struct UpdateProfileUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> UpdateProfileUseCase<R> {
    /// Names only; email, code and roles are administered elsewhere.
    pub async fn execute(&self, id: Uuid, input: UpdateProfileInput) -> Result<User, ApiError> {
        let patch = UserPatch {
            nombres: non_blank(input.nombres),
            apellidos: non_blank(input.apellidos),
            ..Default::default()
        };
        if patch.is_empty() {
            return Err(ApiError::NoFieldsToUpdate);
        }
        self.repo
            .update(id, &patch)
            .await?
            .ok_or(ApiError::UserNotFound)
    }
}

// ── ListUsers ────────────────────────────────────────────────────────────────

pub struct ListUsersUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> ListUsersUseCase<R> {
    pub async fn execute(
        &self,
        filter: UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, ApiError> {
        let filter = UserFilter {
            search: non_blank(filter.search),
            ..filter
        };
        self.repo.list(&filter, page).await
    }
}

// ── CreateUser ───────────────────────────────────────────────────────────────

pub struct CreateUserInput {
    pub codigo_institucional: Option<String>,
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
    pub password: Option<String>,
    pub roles: Option<Vec<Role>>,
    pub activo: Option<bool>,
}

pub struct CreateUserUseCase<R: UserRepository> {
    pub repo: R,
    pub bcrypt_cost: u32,
}

impl<R: UserRepository> CreateUserUseCase<R> {
    /// Roles default to `estudiante` when none are given.
    pub async fn execute(&self, input: CreateUserInput) -> Result<User, ApiError> {
        let identity = validate_identity(input.email, input.nombres, input.apellidos)?;
        let mut roles: RoleSet = input.roles.unwrap_or_default().into();
        if roles.is_empty() {
            roles.insert(Role::Student);
        }
        let password_hash = match input.password.filter(|p| !p.is_empty()) {
            Some(p) => Some(hash_password(p, self.bcrypt_cost).await?),
            None => None,
        };
        self.repo
            .create(&NewUser {
                id: Uuid::now_v7(),
                codigo_institucional: non_blank(input.codigo_institucional),
                email: identity.email,
                nombres: identity.nombres,
                apellidos: identity.apellidos,
                password_hash,
                activo: input.activo.unwrap_or(true),
                roles,
            })
            .await
    }
}

// ── UpdateUser ───────────────────────────────────────────────────────────────

pub struct UpdateUserUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> UpdateUserUseCase<R> {
    pub async fn execute(&self, id: Uuid, patch: UserPatch) -> Result<User, ApiError> {
        let patch = UserPatch {
            codigo_institucional: non_blank(patch.codigo_institucional),
            email: non_blank(patch.email).map(|e| normalize_email(&e)),
            nombres: non_blank(patch.nombres),
            apellidos: non_blank(patch.apellidos),
        };
        if patch.is_empty() {
            return Err(ApiError::NoFieldsToUpdate);
        }
        if let Some(ref email) = patch.email {
            if !validate_email(email) {
                return Err(ApiError::validation("email", "must be a valid email"));
            }
        }
        self.repo
            .update(id, &patch)
            .await?
            .ok_or(ApiError::UserNotFound)
    }
}

// ── SetUserStatus ────────────────────────────────────────────────────────────

/// Activation toggle. Deleting a user through the admin API deactivates it;
/// rows and role memberships are kept.
pub struct SetUserStatusUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> SetUserStatusUseCase<R> {
    pub async fn execute(&self, id: Uuid, activo: bool) -> Result<User, ApiError> {
        self.repo
            .set_active(id, activo)
            .await?
            .ok_or(ApiError::UserNotFound)
    }
}

// ── Roles ────────────────────────────────────────────────────────────────────

pub struct AddRoleUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> AddRoleUseCase<R> {
    pub async fn execute(&self, id: Uuid, role: Role) -> Result<RoleSet, ApiError> {
        self.repo.add_role(id, role).await
    }
}

pub struct RemoveRoleUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> RemoveRoleUseCase<R> {
    pub async fn execute(&self, id: Uuid, role: Role) -> Result<RoleSet, ApiError> {
        self.repo.remove_role(id, role).await
    }
}

pub struct ReplaceRolesUseCase<R: UserRepository> {
    pub repo: R,
}

impl<R: UserRepository> ReplaceRolesUseCase<R> {
    pub async fn execute(&self, id: Uuid, roles: Vec<Role>) -> Result<RoleSet, ApiError> {
        let roles = RoleSet::from(roles);
        if roles.is_empty() {
            return Err(ApiError::validation("roles", "must contain at least one role"));
        }
        self.repo.replace_roles(id, &roles).await
    }
}

// ── Students / teachers ──────────────────────────────────────────────────────

pub struct StudentListing {
    pub user: User,
    /// Present only when enrollments were requested.
    pub enrollments: Option<Vec<UserEnrollment>>,
}

pub struct ListStudentsUseCase<U: UserRepository, E: EnrollmentRepository> {
    pub users: U,
    pub enrollments: E,
}

impl<U: UserRepository, E: EnrollmentRepository> ListStudentsUseCase<U, E> {
    pub async fn execute(
        &self,
        search: Option<String>,
        include_enrollments: bool,
        page: PageRequest,
    ) -> Result<Page<StudentListing>, ApiError> {
        let filter = UserFilter {
            search: non_blank(search),
            role: Some(Role::Student),
            activo: None,
        };
        let users = self.users.list(&filter, page).await?;
        let mut enrollments = if include_enrollments {
            let ids: Vec<Uuid> = users.items.iter().map(|u| u.id).collect();
            Some(self.enrollments.list_for_users(&ids).await?)
        } else {
            None
        };
        Ok(users.map(|user| {
            let enrollments = enrollments.as_mut().map(|all| {
                let (mine, rest): (Vec<_>, Vec<_>) = std::mem::take(all)
                    .into_iter()
                    .partition(|e| e.enrollment.usuario_id == user.id);
                *all = rest;
                mine
            });
            StudentListing { user, enrollments }
        }))
    }
}

pub struct TeacherListing {
    pub user: User,
    /// Present only when assignments were requested.
    pub assignments: Option<Vec<UserAssignment>>,
}

pub struct ListTeachersUseCase<U: UserRepository, A: AssignmentRepository> {
    pub users: U,
    pub assignments: A,
}

impl<U: UserRepository, A: AssignmentRepository> ListTeachersUseCase<U, A> {
    pub async fn execute(
        &self,
        search: Option<String>,
        include_assignments: bool,
        page: PageRequest,
    ) -> Result<Page<TeacherListing>, ApiError> {
        let filter = UserFilter {
            search: non_blank(search),
            role: Some(Role::Teacher),
            activo: None,
        };
        let users = self.users.list(&filter, page).await?;
        let mut assignments = if include_assignments {
            let ids: Vec<Uuid> = users.items.iter().map(|u| u.id).collect();
            Some(self.assignments.list_for_users(&ids).await?)
        } else {
            None
        };
        Ok(users.map(|user| {
            let assignments = assignments.as_mut().map(|all| {
                let (mine, rest): (Vec<_>, Vec<_>) = std::mem::take(all)
                    .into_iter()
                    .partition(|a| a.assignment.usuario_id == user.id);
                *all = rest;
                mine
            });
            TeacherListing { user, assignments }
        }))
    }
}
