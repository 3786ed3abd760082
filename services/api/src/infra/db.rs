use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, FromQueryResult, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Statement, TransactionTrait,
};
use uuid::Uuid;

use suficiencia_api_schema::{
    curso_docentes, curso_estudiantes, cursos, estudiantes, usuario_roles, usuarios,
};
use suficiencia_domain::enrollment::{CourseRelation, EnrollmentStatus};
use suficiencia_domain::pagination::{Page, PageRequest};
use suficiencia_domain::role::{Role, RoleSet};

use crate::domain::repository::{SessionRepository, StatsRepository, UserRepository};
use crate::domain::types::{
    ActivityEntry, ActivityKind, CourseStats, CourseSummary, DashboardStats, NewUser, User,
    UserFilter, UserPatch, UserStats,
};
use crate::error::ApiError;
use crate::infra::course_db::course_summaries;
use crate::infra::{txn_err, unique_as};

// ── Session repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSessionRepository {
    pub db: Arc<DatabaseConnection>,
}

impl SessionRepository for DbSessionRepository {
    async fn user_active(&self, usuario_id: Uuid) -> Result<Option<bool>, ApiError> {
        let user = usuarios::Entity::find_by_id(usuario_id)
            .one(&*self.db)
            .await
            .context("find user for session")?;
        Ok(user.map(|u| u.activo))
    }

    async fn student_id(&self, usuario_id: Uuid) -> Result<Option<Uuid>, ApiError> {
        student_link(&*self.db, usuario_id).await
    }

    async fn course_relation(
        &self,
        usuario_id: Uuid,
        curso_id: Uuid,
    ) -> Result<Option<CourseRelation>, ApiError> {
        let teaching = curso_docentes::Entity::find()
            .filter(curso_docentes::Column::CursoId.eq(curso_id))
            .filter(curso_docentes::Column::UsuarioId.eq(usuario_id))
            .filter(curso_docentes::Column::Activo.eq(true))
            .one(&*self.db)
            .await
            .context("find teacher assignment for course access")?;
        if teaching.is_some() {
            return Ok(Some(CourseRelation::Teacher));
        }

        let enrollment = curso_estudiantes::Entity::find()
            .filter(curso_estudiantes::Column::CursoId.eq(curso_id))
            .filter(curso_estudiantes::Column::UsuarioId.eq(usuario_id))
            .one(&*self.db)
            .await
            .context("find enrollment for course access")?;
        let Some(enrollment) = enrollment else {
            return Ok(None);
        };
        let estado = enrollment
            .estado
            .parse::<EnrollmentStatus>()
            .context("stored enrollment status")?;
        Ok(estado
            .grants_course_access()
            .then_some(CourseRelation::Student))
    }
}

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: Arc<DatabaseConnection>,
}

impl UserRepository for DbUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let model = usuarios::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("find user by id")?;
        match model {
            Some(m) => Ok(Some(with_roles(&*self.db, m).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_login(
        &self,
        email: &str,
        codigo_institucional: Option<&str>,
    ) -> Result<Option<User>, ApiError> {
        let mut cond = Condition::any().add(usuarios::Column::Email.eq(email));
        if let Some(codigo) = codigo_institucional {
            cond = cond.add(usuarios::Column::CodigoInstitucional.eq(codigo));
        }
        let model = usuarios::Entity::find()
            .filter(cond)
            // An exact email match wins over a code match.
            .order_by_desc(Expr::col(usuarios::Column::Email).eq(email))
            .one(&*self.db)
            .await
            .context("find user by login")?;
        match model {
            Some(m) => Ok(Some(with_roles(&*self.db, m).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, user: &NewUser) -> Result<User, ApiError> {
        let user = user.clone();
        self.db
            .transaction::<_, User, ApiError>(|txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let model = usuarios::ActiveModel {
                        id: Set(user.id),
                        codigo_institucional: Set(user.codigo_institucional.clone()),
                        email: Set(user.email.clone()),
                        nombres: Set(user.nombres.clone()),
                        apellidos: Set(user.apellidos.clone()),
                        password_hash: Set(user.password_hash.clone()),
                        activo: Set(user.activo),
                        fecha_creacion: Set(now),
                        fecha_actualizacion: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| unique_as(e, ApiError::EmailExists))?;

                    for role in user.roles.iter() {
                        insert_role(txn, user.id, role).await?;
                    }
                    Ok(user_from_model(model, user.roles.clone()))
                })
            })
            .await
            .map_err(txn_err)
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, ApiError> {
        let Some(model) = usuarios::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("find user for update")?
        else {
            return Ok(None);
        };
        let mut active = model.into_active_model();
        if let Some(v) = &patch.codigo_institucional {
            active.codigo_institucional = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.email {
            active.email = Set(v.clone());
        }
        if let Some(v) = &patch.nombres {
            active.nombres = Set(v.clone());
        }
        if let Some(v) = &patch.apellidos {
            active.apellidos = Set(v.clone());
        }
        active.fecha_actualizacion = Set(Utc::now());
        let model = active
            .update(&*self.db)
            .await
            .map_err(|e| unique_as(e, ApiError::EmailExists))?;
        Ok(Some(with_roles(&*self.db, model).await?))
    }

    async fn touch_login(&self, id: Uuid) -> Result<User, ApiError> {
        self.db
            .transaction::<_, User, ApiError>(|txn| {
                Box::pin(async move {
                    let model = usuarios::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or(ApiError::UserNotFound)?;
                    let mut active = model.into_active_model();
                    active.activo = Set(true);
                    active.fecha_actualizacion = Set(Utc::now());
                    let model = active.update(txn).await?;

                    let mut roles = roles_of(txn, id).await?;
                    if roles.is_empty() {
                        insert_role(txn, id, Role::Student).await?;
                        roles.insert(Role::Student);
                    }
                    Ok(user_from_model(model, roles))
                })
            })
            .await
            .map_err(txn_err)
    }

    async fn set_active(&self, id: Uuid, activo: bool) -> Result<Option<User>, ApiError> {
        let Some(model) = usuarios::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("find user for status change")?
        else {
            return Ok(None);
        };
        let mut active = model.into_active_model();
        active.activo = Set(activo);
        active.fecha_actualizacion = Set(Utc::now());
        let model = active.update(&*self.db).await?;
        Ok(Some(with_roles(&*self.db, model).await?))
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, ApiError> {
        let mut query = usuarios::Entity::find();
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(lower_like(usuarios::Column::Nombres, &pattern))
                    .add(lower_like(usuarios::Column::Apellidos, &pattern))
                    .add(lower_like(usuarios::Column::Email, &pattern))
                    .add(lower_like(usuarios::Column::CodigoInstitucional, &pattern)),
            );
        }
        if let Some(role) = filter.role {
            query = query.filter(holds_role(role));
        }
        if let Some(activo) = filter.activo {
            query = query.filter(usuarios::Column::Activo.eq(activo));
        }

        let total = query
            .clone()
            .count(&*self.db)
            .await
            .context("count users")?;
        let models = query
            .order_by_desc(usuarios::Column::FechaCreacion)
            .offset(page.offset())
            .limit(u64::from(page.limit))
            .all(&*self.db)
            .await
            .context("list users")?;
        Ok(Page {
            items: attach_roles(&*self.db, models).await?,
            total,
        })
    }

    async fn add_role(&self, id: Uuid, role: Role) -> Result<RoleSet, ApiError> {
        self.db
            .transaction::<_, RoleSet, ApiError>(|txn| {
                Box::pin(async move {
                    ensure_user(txn, id).await?;
                    usuario_roles::ActiveModel {
                        usuario_id: Set(id),
                        rol: Set(role.as_str().to_owned()),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| unique_as(e, ApiError::RoleAlreadyAssigned))?;
                    if role == Role::Student {
                        ensure_student_link(txn, id).await?;
                    }
                    roles_of(txn, id).await
                })
            })
            .await
            .map_err(txn_err)
    }

    async fn remove_role(&self, id: Uuid, role: Role) -> Result<RoleSet, ApiError> {
        ensure_user(&*self.db, id).await?;
        let result = usuario_roles::Entity::delete_many()
            .filter(usuario_roles::Column::UsuarioId.eq(id))
            .filter(usuario_roles::Column::Rol.eq(role.as_str()))
            .exec(&*self.db)
            .await
            .context("remove role")?;
        if result.rows_affected == 0 {
            return Err(ApiError::RoleNotAssigned);
        }
        roles_of(&*self.db, id).await
    }

    async fn replace_roles(&self, id: Uuid, roles: &RoleSet) -> Result<RoleSet, ApiError> {
        let roles = roles.clone();
        self.db
            .transaction::<_, RoleSet, ApiError>(|txn| {
                Box::pin(async move {
                    ensure_user(txn, id).await?;
                    usuario_roles::Entity::delete_many()
                        .filter(usuario_roles::Column::UsuarioId.eq(id))
                        .exec(txn)
                        .await?;
                    for role in roles.iter() {
                        insert_role(txn, id, role).await?;
                    }
                    roles_of(txn, id).await
                })
            })
            .await
            .map_err(txn_err)
    }
}

// ── Stats repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbStatsRepository {
    pub db: Arc<DatabaseConnection>,
}

impl StatsRepository for DbStatsRepository {
    async fn dashboard(&self, since: DateTime<Utc>) -> Result<DashboardStats, ApiError> {
        let active = usuarios::Entity::find().filter(usuarios::Column::Activo.eq(true));
        Ok(DashboardStats {
            total_users: active.clone().count(&*self.db).await.context("count users")?,
            total_students: active
                .clone()
                .filter(holds_role(Role::Student))
                .count(&*self.db)
                .await
                .context("count students")?,
            total_teachers: active
                .clone()
                .filter(holds_role(Role::Teacher))
                .count(&*self.db)
                .await
                .context("count teachers")?,
            total_courses: cursos::Entity::find()
                .count(&*self.db)
                .await
                .context("count courses")?,
            active_courses: cursos::Entity::find()
                .filter(cursos::Column::Activo.eq(true))
                .count(&*self.db)
                .await
                .context("count active courses")?,
            new_registrations: active
                .filter(usuarios::Column::FechaCreacion.gte(since))
                .count(&*self.db)
                .await
                .context("count new registrations")?,
        })
    }

    async fn users(&self, since: DateTime<Utc>) -> Result<UserStats, ApiError> {
        let total = usuarios::Entity::find()
            .count(&*self.db)
            .await
            .context("count users")?;
        let activos = usuarios::Entity::find()
            .filter(usuarios::Column::Activo.eq(true))
            .count(&*self.db)
            .await
            .context("count active users")?;
        let nuevos_ultimo_mes = usuarios::Entity::find()
            .filter(usuarios::Column::FechaCreacion.gte(since))
            .count(&*self.db)
            .await
            .context("count recent users")?;
        Ok(UserStats {
            total,
            activos,
            inactivos: total.saturating_sub(activos),
            estudiantes: self.role_count(Role::Student).await?,
            docentes: self.role_count(Role::Teacher).await?,
            administradores: self.role_count(Role::Administrator).await?,
            nuevos_ultimo_mes,
        })
    }

    async fn courses(&self) -> Result<CourseStats, ApiError> {
        let total = cursos::Entity::find()
            .count(&*self.db)
            .await
            .context("count courses")?;
        let activos = cursos::Entity::find()
            .filter(cursos::Column::Activo.eq(true))
            .count(&*self.db)
            .await
            .context("count active courses")?;
        let total_inscripciones = curso_estudiantes::Entity::find()
            .count(&*self.db)
            .await
            .context("count enrollments")?;
        Ok(CourseStats {
            total,
            activos,
            inactivos: total.saturating_sub(activos),
            total_inscripciones,
            inscritos: self.status_count(EnrollmentStatus::Enrolled).await?,
            aprobados: self.status_count(EnrollmentStatus::Passed).await?,
            reprobados: self.status_count(EnrollmentStatus::Failed).await?,
            retirados: self.status_count(EnrollmentStatus::Withdrawn).await?,
            asignaciones_activas: curso_docentes::Entity::find()
                .filter(curso_docentes::Column::Activo.eq(true))
                .count(&*self.db)
                .await
                .context("count active assignments")?,
        })
    }

    async fn user_report(&self) -> Result<Vec<User>, ApiError> {
        let models = usuarios::Entity::find()
            .order_by_desc(usuarios::Column::FechaCreacion)
            .all(&*self.db)
            .await
            .context("load users for report")?;
        attach_roles(&*self.db, models).await
    }

    async fn course_report(&self) -> Result<Vec<CourseSummary>, ApiError> {
        let models = cursos::Entity::find()
            .order_by_asc(cursos::Column::CodigoCurso)
            .all(&*self.db)
            .await
            .context("load courses for report")?;
        course_summaries(&*self.db, models).await
    }

    async fn recent_registrations(
        &self,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<User>, ApiError> {
        let models = usuarios::Entity::find()
            .filter(usuarios::Column::Activo.eq(true))
            .filter(usuarios::Column::FechaCreacion.gte(since))
            .order_by_desc(usuarios::Column::FechaCreacion)
            .limit(limit)
            .all(&*self.db)
            .await
            .context("list recent registrations")?;
        attach_roles(&*self.db, models).await
    }

    async fn activity(
        &self,
        since: DateTime<Utc>,
        tipo: Option<ActivityKind>,
        page: PageRequest,
    ) -> Result<Page<ActivityEntry>, ApiError> {
        #[derive(Debug, FromQueryResult)]
        struct Row {
            tipo: String,
            descripcion: String,
            fecha: DateTime<Utc>,
        }

        #[derive(Debug, FromQueryResult)]
        struct Total {
            total: i64,
        }

        let feed = r#"
            SELECT 'user_created' AS tipo, nombres || ' ' || apellidos AS descripcion,
                   fecha_creacion AS fecha
            FROM usuarios
            WHERE fecha_creacion >= $1 AND ($2::text IS NULL OR $2 = 'user_created')
            UNION ALL
            SELECT 'course_created', nombre, fecha_creacion
            FROM cursos
            WHERE fecha_creacion >= $1 AND ($2::text IS NULL OR $2 = 'course_created')
        "#;
        let backend = self.db.get_database_backend();
        let tipo = tipo.map(|t| t.as_str().to_owned());

        let total = Total::find_by_statement(Statement::from_sql_and_values(
            backend,
            &format!("SELECT COUNT(*) AS total FROM ({feed}) AS feed"),
            [since.into(), tipo.clone().into()],
        ))
        .one(&*self.db)
        .await
        .context("count activity")?
        .map_or(0, |t| u64::try_from(t.total).unwrap_or(0));

        let limit = i64::from(page.limit);
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let rows = Row::find_by_statement(Statement::from_sql_and_values(
            backend,
            &format!("{feed} ORDER BY fecha DESC LIMIT $3 OFFSET $4"),
            [since.into(), tipo.into(), limit.into(), offset.into()],
        ))
        .all(&*self.db)
        .await
        .context("list activity")?;

        let items = rows
            .into_iter()
            .map(|r| {
                Ok(ActivityEntry {
                    tipo: r.tipo.parse::<ActivityKind>().context("stored activity kind")?,
                    descripcion: r.descripcion,
                    fecha: r.fecha,
                })
            })
            .collect::<Result<_, ApiError>>()?;
        Ok(Page { items, total })
    }
}

impl DbStatsRepository {
    async fn role_count(&self, role: Role) -> Result<u64, ApiError> {
        let n = usuario_roles::Entity::find()
            .filter(usuario_roles::Column::Rol.eq(role.as_str()))
            .count(&*self.db)
            .await
            .context("count role members")?;
        Ok(n)
    }

    async fn status_count(&self, estado: EnrollmentStatus) -> Result<u64, ApiError> {
        let n = curso_estudiantes::Entity::find()
            .filter(curso_estudiantes::Column::Estado.eq(estado.as_str()))
            .count(&*self.db)
            .await
            .context("count enrollments by status")?;
        Ok(n)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

pub(crate) async fn student_link<C: ConnectionTrait>(
    conn: &C,
    usuario_id: Uuid,
) -> Result<Option<Uuid>, ApiError> {
    let link = estudiantes::Entity::find()
        .filter(estudiantes::Column::UsuarioId.eq(usuario_id))
        .one(conn)
        .await
        .context("find student link")?;
    Ok(link.map(|s| s.id))
}

async fn ensure_student_link<C: ConnectionTrait>(
    conn: &C,
    usuario_id: Uuid,
) -> Result<(), ApiError> {
    if student_link(conn, usuario_id).await?.is_some() {
        return Ok(());
    }
    estudiantes::ActiveModel {
        id: Set(Uuid::new_v4()),
        usuario_id: Set(usuario_id),
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Insert a role membership; granting the student role also creates the
/// student linkage.
async fn insert_role<C: ConnectionTrait>(
    conn: &C,
    usuario_id: Uuid,
    role: Role,
) -> Result<(), ApiError> {
    usuario_roles::ActiveModel {
        usuario_id: Set(usuario_id),
        rol: Set(role.as_str().to_owned()),
    }
    .insert(conn)
    .await?;
    if role == Role::Student {
        ensure_student_link(conn, usuario_id).await?;
    }
    Ok(())
}

async fn ensure_user<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<(), ApiError> {
    usuarios::Entity::find_by_id(id)
        .one(conn)
        .await
        .context("find user")?
        .map(|_| ())
        .ok_or(ApiError::UserNotFound)
}

async fn roles_of<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<RoleSet, ApiError> {
    let mut by_user = roles_by_user(conn, &[id]).await?;
    Ok(by_user.remove(&id).unwrap_or_default())
}

async fn roles_by_user<C: ConnectionTrait>(
    conn: &C,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, RoleSet>, ApiError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = usuario_roles::Entity::find()
        .filter(usuario_roles::Column::UsuarioId.is_in(ids.iter().copied()))
        .all(conn)
        .await
        .context("load user roles")?;

    let mut raw: HashMap<Uuid, Vec<String>> = HashMap::new();
    for row in rows {
        raw.entry(row.usuario_id).or_default().push(row.rol);
    }
    raw.into_iter()
        .map(|(id, names)| -> Result<(Uuid, RoleSet), ApiError> {
            let roles = RoleSet::parse_stored(&names).context("stored role name")?;
            Ok((id, roles))
        })
        .collect()
}

async fn with_roles<C: ConnectionTrait>(
    conn: &C,
    model: usuarios::Model,
) -> Result<User, ApiError> {
    let roles = roles_of(conn, model.id).await?;
    Ok(user_from_model(model, roles))
}

pub(crate) async fn attach_roles<C: ConnectionTrait>(
    conn: &C,
    models: Vec<usuarios::Model>,
) -> Result<Vec<User>, ApiError> {
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut roles = roles_by_user(conn, &ids).await?;
    Ok(models
        .into_iter()
        .map(|m| {
            let r = roles.remove(&m.id).unwrap_or_default();
            user_from_model(m, r)
        })
        .collect())
}

/// Users holding `role`.
pub(crate) fn holds_role(role: Role) -> SimpleExpr {
    usuarios::Column::Id.in_subquery(
        Query::select()
            .column(usuario_roles::Column::UsuarioId)
            .from(usuario_roles::Entity)
            .and_where(usuario_roles::Column::Rol.eq(role.as_str()))
            .to_owned(),
    )
}

/// `lower(column) LIKE pattern`; `pattern` must already be lower-case.
pub(crate) fn lower_like<C: ColumnTrait>(column: C, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(pattern)
}

fn user_from_model(model: usuarios::Model, roles: RoleSet) -> User {
    User {
        id: model.id,
        codigo_institucional: model.codigo_institucional,
        email: model.email,
        nombres: model.nombres,
        apellidos: model.apellidos,
        activo: model.activo,
        roles,
        fecha_creacion: model.fecha_creacion,
        fecha_actualizacion: model.fecha_actualizacion,
    }
}
