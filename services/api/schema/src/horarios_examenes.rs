use sea_orm::entity::prelude::*;

/// Exam time slot. `cupos_ocupados` counts booking rows and never exceeds
/// `cupos_disponibles`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "horarios_examenes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub fecha_examen: chrono::NaiveDate,
    pub hora_inicio: chrono::NaiveTime,
    pub hora_fin: chrono::NaiveTime,
    pub cupos_disponibles: i32,
    pub cupos_ocupados: i32,
    pub activo: bool,
    pub creado_por: Option<Uuid>,
    pub fecha_creacion: chrono::DateTime<chrono::Utc>,
    pub fecha_actualizacion: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::agendamientos_examen::Entity")]
    AgendamientosExamen,
}

impl Related<super::agendamientos_examen::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AgendamientosExamen.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
