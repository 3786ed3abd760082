pub mod agendamientos_examen;
pub mod curso_docentes;
pub mod curso_estudiantes;
pub mod cursos;
pub mod estudiantes;
pub mod horarios_examenes;
pub mod usuario_roles;
pub mod usuarios;
