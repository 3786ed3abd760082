use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cursos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub codigo_curso: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub porcentaje_minimo_examen: i32,
    pub activo: bool,
    pub creado_por: Option<Uuid>,
    pub fecha_creacion: chrono::DateTime<chrono::Utc>,
    pub fecha_actualizacion: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::curso_estudiantes::Entity")]
    CursoEstudiantes,
    #[sea_orm(has_many = "super::curso_docentes::Entity")]
    CursoDocentes,
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
