use sea_orm::entity::prelude::*;

/// Teacher assignment to a course. Unique per (curso_id, usuario_id).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "curso_docentes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub curso_id: Uuid,
    pub usuario_id: Uuid,
    pub tipo_asignacion: String,
    pub activo: bool,
    pub fecha_asignacion: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cursos::Entity",
        from = "Column::CursoId",
        to = "super::cursos::Column::Id"
    )]
    Curso,
    #[sea_orm(
        belongs_to = "super::usuarios::Entity",
        from = "Column::UsuarioId",
        to = "super::usuarios::Column::Id"
    )]
    Usuario,
}

impl Related<super::cursos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Curso.def()
    }
}

impl Related<super::usuarios::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usuario.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
