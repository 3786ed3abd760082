use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .table(CursoEstudiantes::Table)
                    .col(CursoEstudiantes::UsuarioId)
                    .name("idx_curso_estudiantes_usuario_id")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(CursoDocentes::Table)
                    .col(CursoDocentes::UsuarioId)
                    .name("idx_curso_docentes_usuario_id")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(HorariosExamenes::Table)
                    .col(HorariosExamenes::FechaExamen)
                    .col(HorariosExamenes::HoraInicio)
                    .name("idx_horarios_examenes_fecha_hora")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_horarios_examenes_fecha_hora")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name("idx_curso_docentes_usuario_id").to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_curso_estudiantes_usuario_id")
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum CursoEstudiantes {
    Table,
    UsuarioId,
}

#[derive(Iden)]
enum CursoDocentes {
    Table,
    UsuarioId,
}

#[derive(Iden)]
enum HorariosExamenes {
    Table,
    FechaExamen,
    HoraInicio,
}
