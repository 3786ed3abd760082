use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cursos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Cursos::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Cursos::CodigoCurso)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Cursos::Nombre).string_len(200).not_null())
                    .col(ColumnDef::new(Cursos::Descripcion).text())
                    .col(
                        ColumnDef::new(Cursos::PorcentajeMinimoExamen)
                            .integer()
                            .not_null()
                            .default(70)
                            .check(Expr::col(Cursos::PorcentajeMinimoExamen).between(0, 100)),
                    )
                    .col(
                        ColumnDef::new(Cursos::Activo)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Cursos::CreadoPor).uuid())
                    .col(
                        ColumnDef::new(Cursos::FechaCreacion)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Cursos::FechaActualizacion)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Cursos::Table, Cursos::CreadoPor)
                            .to(Usuarios::Table, Usuarios::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CursoEstudiantes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CursoEstudiantes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CursoEstudiantes::CursoId).uuid().not_null())
                    .col(ColumnDef::new(CursoEstudiantes::UsuarioId).uuid().not_null())
                    .col(
                        ColumnDef::new(CursoEstudiantes::Estado)
                            .string_len(20)
                            .not_null()
                            .default("inscrito")
                            .check(Expr::col(CursoEstudiantes::Estado).is_in([
                                "inscrito",
                                "aprobado",
                                "reprobado",
                                "retirado",
                            ])),
                    )
                    .col(ColumnDef::new(CursoEstudiantes::NotaFinal).double())
                    .col(
                        ColumnDef::new(CursoEstudiantes::FechaInscripcion)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CursoEstudiantes::FechaEstado)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(CursoEstudiantes::Table, CursoEstudiantes::CursoId)
                            .to(Cursos::Table, Cursos::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(CursoEstudiantes::Table, CursoEstudiantes::UsuarioId)
                            .to(Usuarios::Table, Usuarios::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(CursoEstudiantes::Table)
                    .col(CursoEstudiantes::CursoId)
                    .col(CursoEstudiantes::UsuarioId)
                    .unique()
                    .name("uq_curso_estudiantes_curso_usuario")
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CursoDocentes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CursoDocentes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CursoDocentes::CursoId).uuid().not_null())
                    .col(ColumnDef::new(CursoDocentes::UsuarioId).uuid().not_null())
                    .col(
                        ColumnDef::new(CursoDocentes::TipoAsignacion)
                            .string_len(20)
                            .not_null()
                            .default("titular")
                            .check(Expr::col(CursoDocentes::TipoAsignacion).is_in([
                                "titular",
                                "asistente",
                                "colaborador",
                            ])),
                    )
                    .col(
                        ColumnDef::new(CursoDocentes::Activo)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(CursoDocentes::FechaAsignacion)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(CursoDocentes::Table, CursoDocentes::CursoId)
                            .to(Cursos::Table, Cursos::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(CursoDocentes::Table, CursoDocentes::UsuarioId)
                            .to(Usuarios::Table, Usuarios::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(CursoDocentes::Table)
                    .col(CursoDocentes::CursoId)
                    .col(CursoDocentes::UsuarioId)
                    .unique()
                    .name("uq_curso_docentes_curso_usuario")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CursoDocentes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CursoEstudiantes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cursos::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Cursos {
    Table,
    Id,
    CodigoCurso,
    Nombre,
    Descripcion,
    PorcentajeMinimoExamen,
    Activo,
    CreadoPor,
    FechaCreacion,
    FechaActualizacion,
}

#[derive(Iden)]
enum CursoEstudiantes {
    Table,
    Id,
    CursoId,
    UsuarioId,
    Estado,
    NotaFinal,
    FechaInscripcion,
    FechaEstado,
}

#[derive(Iden)]
enum CursoDocentes {
    Table,
    Id,
    CursoId,
    UsuarioId,
    TipoAsignacion,
    Activo,
    FechaAsignacion,
}

#[derive(Iden)]
enum Usuarios {
    Table,
    Id,
}
