use sea_orm::entity::prelude::*;

/// Platform user. Deactivation is soft (`activo = false`); roles persist.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "usuarios")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub codigo_institucional: Option<String>,
    #[sea_orm(unique)]
    pub email: String,
    pub nombres: String,
    pub apellidos: String,
    pub password_hash: Option<String>,
    pub activo: bool,
    pub fecha_creacion: chrono::DateTime<chrono::Utc>,
    pub fecha_actualizacion: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::usuario_roles::Entity")]
    UsuarioRoles,
    #[sea_orm(has_one = "super::estudiantes::Entity")]
    Estudiantes,
    #[sea_orm(has_many = "super::curso_estudiantes::Entity")]
    CursoEstudiantes,
    #[sea_orm(has_many = "super::curso_docentes::Entity")]
    CursoDocentes,
}

impl Related<super::usuario_roles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsuarioRoles.def()
    }
}

impl Related<super::estudiantes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Estudiantes.def()
    }
}

impl Related<super::curso_estudiantes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CursoEstudiantes.def()
    }
}

impl Related<super::curso_docentes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CursoDocentes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
