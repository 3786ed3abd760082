use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use suficiencia_api::domain::repository::{
    AssignmentRepository, CourseRepository, EnrollmentRepository, ExamScheduleRepository,
    IdentityProvider, SessionRepository, StatsRepository, UserRepository,
};
use suficiencia_api::domain::types::{
    ActivityEntry, ActivityKind, Assignment, AssignmentPatch, Booking, Course, CourseFilter,
    CoursePatch, CourseStats, CourseStudent, CourseSummary, CourseTeacher, DashboardStats,
    Enrollment, EnrollmentPatch, ExamSchedule, ExamSchedulePatch, NewCourse, NewUser,
    ScheduleFilter, ScheduleStats, ScheduledStudent, StudentCourse, StudentSummary, TeacherCourse,
    User, UserAssignment, UserEnrollment, UserFilter, UserPatch, UserStats, VerifiedIdentity,
    ensure_bookable,
};
use suficiencia_api::error::ApiError;
use suficiencia_domain::enrollment::{AssignmentType, CourseRelation, EnrollmentStatus};
use suficiencia_domain::exam::BookingStatus;
use suficiencia_domain::pagination::{Page, PageRequest};
use suficiencia_domain::role::{Role, RoleSet};

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    Page { items, total }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn test_user(roles: &[Role]) -> User {
    let id = Uuid::now_v7();
    User {
        id,
        codigo_institucional: None,
        email: format!("{id}@uni.test"),
        nombres: "Ana".to_owned(),
        apellidos: "Pérez".to_owned(),
        activo: true,
        roles: roles.iter().copied().collect(),
        fecha_creacion: Utc::now(),
        fecha_actualizacion: Utc::now(),
    }
}

pub fn test_course() -> Course {
    Course {
        id: Uuid::now_v7(),
        codigo_curso: "MAT101".to_owned(),
        nombre: "Cálculo I".to_owned(),
        descripcion: None,
        porcentaje_minimo_examen: 70,
        activo: true,
        creado_por: None,
        fecha_creacion: Utc::now(),
        fecha_actualizacion: Utc::now(),
    }
}

pub fn tomorrow() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(1)
}

pub fn at(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).expect("valid hour")
}

pub fn test_schedule(cupos_disponibles: i32) -> ExamSchedule {
    ExamSchedule {
        id: Uuid::now_v7(),
        fecha_examen: tomorrow(),
        hora_inicio: at(9),
        hora_fin: at(11),
        cupos_disponibles,
        cupos_ocupados: 0,
        activo: true,
        creado_por: None,
        fecha_creacion: Utc::now(),
        fecha_actualizacion: Utc::now(),
    }
}

// ── MockSessionRepo ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockSessionRepo {
    pub active: HashMap<Uuid, bool>,
    /// usuario_id → estudiante_id
    pub students: HashMap<Uuid, Uuid>,
    pub relations: HashMap<(Uuid, Uuid), CourseRelation>,
}

impl MockSessionRepo {
    pub fn with_user(mut self, usuario_id: Uuid, activo: bool) -> Self {
        self.active.insert(usuario_id, activo);
        self
    }

    pub fn with_student(mut self, usuario_id: Uuid, estudiante_id: Uuid) -> Self {
        self.active.insert(usuario_id, true);
        self.students.insert(usuario_id, estudiante_id);
        self
    }
}

impl SessionRepository for MockSessionRepo {
    async fn user_active(&self, usuario_id: Uuid) -> Result<Option<bool>, ApiError> {
        Ok(self.active.get(&usuario_id).copied())
    }

    async fn student_id(&self, usuario_id: Uuid) -> Result<Option<Uuid>, ApiError> {
        Ok(self.students.get(&usuario_id).copied())
    }

    async fn course_relation(
        &self,
        usuario_id: Uuid,
        curso_id: Uuid,
    ) -> Result<Option<CourseRelation>, ApiError> {
        Ok(self.relations.get(&(usuario_id, curso_id)).copied())
    }
}

// ── MockUserRepo ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockUserRepo {
    pub users: Arc<Mutex<Vec<User>>>,
}

impl MockUserRepo {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }

    /// Returns a shared handle to the internal user list for post-execution inspection.
    pub fn users_handle(&self) -> Arc<Mutex<Vec<User>>> {
        Arc::clone(&self.users)
    }

    fn with_user<T>(&self, id: Uuid, f: impl FnOnce(&mut User) -> T) -> Option<T> {
        let mut users = self.users.lock().unwrap();
        users.iter_mut().find(|u| u.id == id).map(f)
    }
}

impl UserRepository for MockUserRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_login(
        &self,
        email: &str,
        codigo_institucional: Option<&str>,
    ) -> Result<Option<User>, ApiError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| {
                u.email == email
                    || (codigo_institucional.is_some()
                        && u.codigo_institucional.as_deref() == codigo_institucional)
            })
            .cloned())
    }

    async fn create(&self, user: &NewUser) -> Result<User, ApiError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(ApiError::EmailExists);
        }
        let now = Utc::now();
        let created = User {
            id: user.id,
            codigo_institucional: user.codigo_institucional.clone(),
            email: user.email.clone(),
            nombres: user.nombres.clone(),
            apellidos: user.apellidos.clone(),
            activo: user.activo,
            roles: user.roles.clone(),
            fecha_creacion: now,
            fecha_actualizacion: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, ApiError> {
        Ok(self.with_user(id, |u| {
            if let Some(v) = &patch.email {
                u.email = v.clone();
            }
            if let Some(v) = &patch.nombres {
                u.nombres = v.clone();
            }
            if let Some(v) = &patch.apellidos {
                u.apellidos = v.clone();
            }
            if let Some(v) = &patch.codigo_institucional {
                u.codigo_institucional = Some(v.clone());
            }
            u.fecha_actualizacion = Utc::now();
            u.clone()
        }))
    }

    async fn touch_login(&self, id: Uuid) -> Result<User, ApiError> {
        self.with_user(id, |u| {
            u.activo = true;
            if u.roles.is_empty() {
                u.roles.insert(Role::Student);
            }
            u.fecha_actualizacion = Utc::now();
            u.clone()
        })
        .ok_or(ApiError::UserNotFound)
    }

    async fn set_active(&self, id: Uuid, activo: bool) -> Result<Option<User>, ApiError> {
        Ok(self.with_user(id, |u| {
            u.activo = activo;
            u.clone()
        }))
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, ApiError> {
        let matching: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| filter.role.is_none_or(|r| u.roles.contains(r)))
            .filter(|u| filter.activo.is_none_or(|a| u.activo == a))
            .filter(|u| {
                filter.search.as_deref().is_none_or(|s| {
                    let s = s.to_lowercase();
                    u.email.contains(&s) || u.full_name().to_lowercase().contains(&s)
                })
            })
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn add_role(&self, id: Uuid, role: Role) -> Result<RoleSet, ApiError> {
        self.with_user(id, |u| {
            if u.roles.insert(role) {
                Ok(u.roles.clone())
            } else {
                Err(ApiError::RoleAlreadyAssigned)
            }
        })
        .ok_or(ApiError::UserNotFound)?
    }

    async fn remove_role(&self, id: Uuid, role: Role) -> Result<RoleSet, ApiError> {
        self.with_user(id, |u| {
            if u.roles.remove(role) {
                Ok(u.roles.clone())
            } else {
                Err(ApiError::RoleNotAssigned)
            }
        })
        .ok_or(ApiError::UserNotFound)?
    }

    async fn replace_roles(&self, id: Uuid, roles: &RoleSet) -> Result<RoleSet, ApiError> {
        self.with_user(id, |u| {
            u.roles = roles.clone();
            u.roles.clone()
        })
        .ok_or(ApiError::UserNotFound)
    }
}

// ── MockCourseRepo ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockCourseRepo {
    pub courses: Arc<Mutex<Vec<Course>>>,
    pub dependents: u64,
}

impl MockCourseRepo {
    pub fn new(courses: Vec<Course>) -> Self {
        Self {
            courses: Arc::new(Mutex::new(courses)),
            dependents: 0,
        }
    }

    pub fn courses_handle(&self) -> Arc<Mutex<Vec<Course>>> {
        Arc::clone(&self.courses)
    }
}

impl CourseRepository for MockCourseRepo {
    async fn list(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<Page<CourseSummary>, ApiError> {
        let matching: Vec<CourseSummary> = self
            .courses
            .lock()
            .unwrap()
            .iter()
            .filter(|c| filter.activo.is_none_or(|a| c.activo == a))
            .map(|c| CourseSummary {
                course: c.clone(),
                total_estudiantes: 0,
                total_docentes: 0,
            })
            .collect();
        Ok(paginate(matching, page))
    }

    async fn find(&self, id: Uuid) -> Result<Option<Course>, ApiError> {
        Ok(self.courses.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, course: &NewCourse) -> Result<Course, ApiError> {
        let mut courses = self.courses.lock().unwrap();
        if courses.iter().any(|c| c.codigo_curso == course.codigo_curso) {
            return Err(ApiError::CourseCodeExists);
        }
        let now = Utc::now();
        let created = Course {
            id: Uuid::now_v7(),
            codigo_curso: course.codigo_curso.clone(),
            nombre: course.nombre.clone(),
            descripcion: course.descripcion.clone(),
            porcentaje_minimo_examen: course.porcentaje_minimo_examen,
            activo: course.activo,
            creado_por: course.creado_por,
            fecha_creacion: now,
            fecha_actualizacion: now,
        };
        courses.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: &CoursePatch) -> Result<Option<Course>, ApiError> {
        let mut courses = self.courses.lock().unwrap();
        Ok(courses.iter_mut().find(|c| c.id == id).map(|c| {
            if let Some(v) = &patch.nombre {
                c.nombre = v.clone();
            }
            if let Some(v) = patch.porcentaje_minimo_examen {
                c.porcentaje_minimo_examen = v;
            }
            if let Some(v) = patch.activo {
                c.activo = v;
            }
            c.clone()
        }))
    }

    async fn dependents(&self, _id: Uuid) -> Result<u64, ApiError> {
        Ok(self.dependents)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut courses = self.courses.lock().unwrap();
        let before = courses.len();
        courses.retain(|c| c.id != id);
        Ok(courses.len() < before)
    }

    /// Every stored course, as an `inscrito` enrollment.
    async fn student_courses(
        &self,
        _usuario_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<StudentCourse>, ApiError> {
        let courses = self.courses.lock().unwrap().clone();
        let items = courses
            .into_iter()
            .map(|course| StudentCourse {
                fecha_inscripcion: course.fecha_creacion,
                fecha_estado: course.fecha_creacion,
                course,
                estado: EnrollmentStatus::Enrolled,
                nota_final: None,
            })
            .collect();
        Ok(paginate(items, page))
    }

    /// Every stored course, as a lead assignment.
    async fn teacher_courses(
        &self,
        _usuario_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<TeacherCourse>, ApiError> {
        let courses = self.courses.lock().unwrap().clone();
        let items = courses
            .into_iter()
            .map(|course| TeacherCourse {
                fecha_asignacion: course.fecha_creacion,
                course,
                tipo_asignacion: AssignmentType::Lead,
                total_estudiantes: 0,
            })
            .collect();
        Ok(paginate(items, page))
    }
}

// ── MockEnrollmentRepo ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockEnrollmentRepo {
    pub enrollments: Arc<Mutex<Vec<Enrollment>>>,
}

impl MockEnrollmentRepo {
    pub fn enrollments_handle(&self) -> Arc<Mutex<Vec<Enrollment>>> {
        Arc::clone(&self.enrollments)
    }
}

impl EnrollmentRepository for MockEnrollmentRepo {
    async fn find(&self, id: Uuid) -> Result<Option<Enrollment>, ApiError> {
        Ok(self.enrollments.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }

    async fn find_pair(
        &self,
        curso_id: Uuid,
        usuario_id: Uuid,
    ) -> Result<Option<Enrollment>, ApiError> {
        Ok(self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.curso_id == curso_id && e.usuario_id == usuario_id)
            .cloned())
    }

    async fn insert(&self, enrollment: &Enrollment) -> Result<Enrollment, ApiError> {
        let mut enrollments = self.enrollments.lock().unwrap();
        if enrollments
            .iter()
            .any(|e| e.curso_id == enrollment.curso_id && e.usuario_id == enrollment.usuario_id)
        {
            return Err(ApiError::AlreadyEnrolled);
        }
        enrollments.push(enrollment.clone());
        Ok(enrollment.clone())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: EnrollmentPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>, ApiError> {
        let mut enrollments = self.enrollments.lock().unwrap();
        Ok(enrollments.iter_mut().find(|e| e.id == id).map(|e| {
            if let Some(estado) = patch.estado {
                e.estado = estado;
            }
            if patch.nota_final.is_some() {
                e.nota_final = patch.nota_final;
            }
            e.fecha_estado = now;
            e.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut enrollments = self.enrollments.lock().unwrap();
        let before = enrollments.len();
        enrollments.retain(|e| e.id != id);
        Ok(enrollments.len() < before)
    }

    async fn list_for_course(
        &self,
        curso_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CourseStudent>, ApiError> {
        let rows: Vec<CourseStudent> = self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.curso_id == curso_id)
            .map(|e| CourseStudent {
                enrollment: e.clone(),
                codigo_institucional: None,
                email: format!("{}@uni.test", e.usuario_id),
                nombres: "Ana".to_owned(),
                apellidos: "Pérez".to_owned(),
            })
            .collect();
        Ok(paginate(rows, page))
    }

    async fn list_for_users(&self, usuario_ids: &[Uuid]) -> Result<Vec<UserEnrollment>, ApiError> {
        Ok(self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .filter(|e| usuario_ids.contains(&e.usuario_id))
            .map(|e| UserEnrollment {
                enrollment: e.clone(),
                codigo_curso: "MAT101".to_owned(),
                curso_nombre: "Cálculo I".to_owned(),
            })
            .collect())
    }
}

// ── MockAssignmentRepo ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockAssignmentRepo {
    pub assignments: Arc<Mutex<Vec<Assignment>>>,
}

impl MockAssignmentRepo {
    pub fn assignments_handle(&self) -> Arc<Mutex<Vec<Assignment>>> {
        Arc::clone(&self.assignments)
    }
}

impl AssignmentRepository for MockAssignmentRepo {
    async fn find(&self, id: Uuid) -> Result<Option<Assignment>, ApiError> {
        Ok(self.assignments.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn insert(&self, assignment: &Assignment) -> Result<Assignment, ApiError> {
        let mut assignments = self.assignments.lock().unwrap();
        if assignments
            .iter()
            .any(|a| a.curso_id == assignment.curso_id && a.usuario_id == assignment.usuario_id)
        {
            return Err(ApiError::AlreadyAssigned);
        }
        assignments.push(assignment.clone());
        Ok(assignment.clone())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: AssignmentPatch,
    ) -> Result<Option<Assignment>, ApiError> {
        let mut assignments = self.assignments.lock().unwrap();
        Ok(assignments.iter_mut().find(|a| a.id == id).map(|a| {
            if let Some(t) = patch.tipo_asignacion {
                a.tipo_asignacion = t;
            }
            if let Some(v) = patch.activo {
                a.activo = v;
            }
            a.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut assignments = self.assignments.lock().unwrap();
        let before = assignments.len();
        assignments.retain(|a| a.id != id);
        Ok(assignments.len() < before)
    }

    async fn list_for_course(&self, curso_id: Uuid) -> Result<Vec<CourseTeacher>, ApiError> {
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.curso_id == curso_id)
            .map(|a| CourseTeacher {
                assignment: a.clone(),
                codigo_institucional: None,
                email: format!("{}@uni.test", a.usuario_id),
                nombres: "Luis".to_owned(),
                apellidos: "Gómez".to_owned(),
            })
            .collect())
    }

    async fn list_for_users(
        &self,
        usuario_ids: &[Uuid],
    ) -> Result<Vec<UserAssignment>, ApiError> {
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| usuario_ids.contains(&a.usuario_id))
            .map(|a| UserAssignment {
                assignment: a.clone(),
                codigo_curso: "MAT101".to_owned(),
                curso_nombre: "Cálculo I".to_owned(),
            })
            .collect())
    }
}

// ── MockExamScheduleRepo ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockExamScheduleRepo {
    pub schedules: Arc<Mutex<Vec<ExamSchedule>>>,
    pub bookings: Arc<Mutex<Vec<Booking>>>,
}

impl MockExamScheduleRepo {
    pub fn new(schedules: Vec<ExamSchedule>) -> Self {
        Self {
            schedules: Arc::new(Mutex::new(schedules)),
            bookings: Arc::default(),
        }
    }

    pub fn schedules_handle(&self) -> Arc<Mutex<Vec<ExamSchedule>>> {
        Arc::clone(&self.schedules)
    }

    pub fn bookings_handle(&self) -> Arc<Mutex<Vec<Booking>>> {
        Arc::clone(&self.bookings)
    }
}

impl ExamScheduleRepository for MockExamScheduleRepo {
    async fn list(
        &self,
        filter: ScheduleFilter,
        page: PageRequest,
    ) -> Result<Page<ExamSchedule>, ApiError> {
        let matching: Vec<ExamSchedule> = self
            .schedules
            .lock()
            .unwrap()
            .iter()
            .filter(|s| filter.search.as_deref().is_none_or(|q| s.matches_search(q)))
            .filter(|s| filter.fecha.is_none_or(|f| s.fecha_examen == f))
            .filter(|s| filter.activo.is_none_or(|a| s.activo == a))
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn stats(&self, today: NaiveDate) -> Result<ScheduleStats, ApiError> {
        let schedules = self.schedules.lock().unwrap();
        Ok(ScheduleStats {
            total_horarios: schedules.len() as u64,
            horarios_activos: schedules.iter().filter(|s| s.activo).count() as u64,
            cupos_totales: schedules.iter().map(|s| s.cupos_disponibles as u64).sum(),
            cupos_ocupados: schedules.iter().map(|s| s.cupos_ocupados as u64).sum(),
            horarios_futuros: schedules.iter().filter(|s| s.fecha_examen >= today).count() as u64,
            estudiantes_agendados: self
                .bookings
                .lock()
                .unwrap()
                .iter()
                .filter(|b| b.estado != BookingStatus::Cancelled)
                .map(|b| b.estudiante_id)
                .collect::<HashSet<_>>()
                .len() as u64,
        })
    }

    async fn find(&self, id: Uuid) -> Result<Option<ExamSchedule>, ApiError> {
        Ok(self.schedules.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn exists_at(
        &self,
        fecha_examen: NaiveDate,
        hora_inicio: NaiveTime,
        exclude: Option<Uuid>,
    ) -> Result<bool, ApiError> {
        Ok(self.schedules.lock().unwrap().iter().any(|s| {
            s.fecha_examen == fecha_examen && s.hora_inicio == hora_inicio && Some(s.id) != exclude
        }))
    }

    async fn create(&self, schedule: &ExamSchedule) -> Result<ExamSchedule, ApiError> {
        self.schedules.lock().unwrap().push(schedule.clone());
        Ok(schedule.clone())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &ExamSchedulePatch,
    ) -> Result<Option<ExamSchedule>, ApiError> {
        let mut schedules = self.schedules.lock().unwrap();
        Ok(schedules.iter_mut().find(|s| s.id == id).map(|s| {
            *s = patch.apply_to(s);
            s.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        if self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .any(|b| b.horario_examen_id == id)
        {
            return Err(ApiError::ScheduleHasStudents);
        }
        let mut schedules = self.schedules.lock().unwrap();
        let before = schedules.len();
        schedules.retain(|s| s.id != id);
        Ok(schedules.len() < before)
    }

    async fn booking_count(&self, id: Uuid) -> Result<u64, ApiError> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.horario_examen_id == id)
            .count() as u64)
    }

    async fn list_students(&self, id: Uuid) -> Result<Vec<ScheduledStudent>, ApiError> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.horario_examen_id == id)
            .map(|b| ScheduledStudent {
                booking: b.clone(),
                usuario_id: Uuid::nil(),
                codigo_institucional: None,
                email: format!("{}@uni.test", b.estudiante_id),
                nombres: "Ana".to_owned(),
                apellidos: "Pérez".to_owned(),
            })
            .collect())
    }

    async fn available_students(
        &self,
        _id: Uuid,
        _limit: u64,
    ) -> Result<Vec<StudentSummary>, ApiError> {
        Ok(vec![])
    }

    async fn book(&self, horario_id: Uuid, estudiante_id: Uuid) -> Result<Booking, ApiError> {
        let mut schedules = self.schedules.lock().unwrap();
        let mut bookings = self.bookings.lock().unwrap();
        let Some(schedule) = schedules.iter_mut().find(|s| s.id == horario_id) else {
            return Err(ApiError::ScheduleNotFound);
        };
        ensure_bookable(Some(&*schedule))?;
        if bookings
            .iter()
            .any(|b| b.horario_examen_id == horario_id && b.estudiante_id == estudiante_id)
        {
            return Err(ApiError::StudentAlreadyScheduled);
        }
        let booking = Booking {
            id: Uuid::now_v7(),
            horario_examen_id: horario_id,
            estudiante_id,
            estado: BookingStatus::Booked,
            fecha_agendamiento: Utc::now(),
        };
        bookings.push(booking.clone());
        schedule.cupos_ocupados += 1;
        Ok(booking)
    }

    async fn unbook(&self, horario_id: Uuid, estudiante_id: Uuid) -> Result<(), ApiError> {
        let mut schedules = self.schedules.lock().unwrap();
        let mut bookings = self.bookings.lock().unwrap();
        let before = bookings.len();
        bookings
            .retain(|b| !(b.horario_examen_id == horario_id && b.estudiante_id == estudiante_id));
        if bookings.len() == before {
            return Err(ApiError::AppointmentNotFound);
        }
        if let Some(schedule) = schedules.iter_mut().find(|s| s.id == horario_id) {
            schedule.cupos_ocupados = (schedule.cupos_ocupados - 1).max(0);
        }
        Ok(())
    }

    async fn set_booking_status(
        &self,
        horario_id: Uuid,
        estudiante_id: Uuid,
        estado: BookingStatus,
    ) -> Result<Option<Booking>, ApiError> {
        let mut bookings = self.bookings.lock().unwrap();
        Ok(bookings
            .iter_mut()
            .find(|b| b.horario_examen_id == horario_id && b.estudiante_id == estudiante_id)
            .map(|b| {
                b.estado = estado;
                b.clone()
            }))
    }
}

// ── MockStatsRepo ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStatsRepo {
    pub users: Vec<User>,
    pub courses: Vec<Course>,
}

impl StatsRepository for MockStatsRepo {
    async fn dashboard(&self, since: DateTime<Utc>) -> Result<DashboardStats, ApiError> {
        Ok(DashboardStats {
            total_users: self.users.len() as u64,
            new_registrations: self
                .users
                .iter()
                .filter(|u| u.fecha_creacion >= since)
                .count() as u64,
            ..DashboardStats::default()
        })
    }

    async fn users(&self, _since: DateTime<Utc>) -> Result<UserStats, ApiError> {
        Ok(UserStats {
            total: self.users.len() as u64,
            ..UserStats::default()
        })
    }

    async fn courses(&self) -> Result<CourseStats, ApiError> {
        Ok(CourseStats::default())
    }

    async fn user_report(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.users.clone())
    }

    async fn course_report(&self) -> Result<Vec<CourseSummary>, ApiError> {
        Ok(vec![])
    }

    async fn recent_registrations(
        &self,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<User>, ApiError> {
        let mut recent: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.activo && u.fecha_creacion >= since)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.fecha_creacion.cmp(&a.fecha_creacion));
        recent.truncate(limit as usize);
        Ok(recent)
    }

    async fn activity(
        &self,
        since: DateTime<Utc>,
        tipo: Option<ActivityKind>,
        page: PageRequest,
    ) -> Result<Page<ActivityEntry>, ApiError> {
        let users = self.users.iter().map(|u| ActivityEntry {
            tipo: ActivityKind::UserCreated,
            descripcion: u.full_name(),
            fecha: u.fecha_creacion,
        });
        let courses = self.courses.iter().map(|c| ActivityEntry {
            tipo: ActivityKind::CourseCreated,
            descripcion: c.nombre.clone(),
            fecha: c.fecha_creacion,
        });
        let mut feed: Vec<ActivityEntry> = users
            .chain(courses)
            .filter(|e| e.fecha >= since && tipo.is_none_or(|t| e.tipo == t))
            .collect();
        feed.sort_by(|a, b| b.fecha.cmp(&a.fecha));
        Ok(paginate(feed, page))
    }
}

// ── MockIdentityProvider ─────────────────────────────────────────────────────

/// Accepts exactly one email/password pair.
pub struct MockIdentityProvider {
    pub identity: VerifiedIdentity,
    pub password: String,
}

impl MockIdentityProvider {
    pub fn accepting(email: &str, password: &str) -> Self {
        Self {
            identity: VerifiedIdentity {
                email: email.to_owned(),
                codigo_institucional: None,
                nombres: "Ana".to_owned(),
                apellidos: "Pérez".to_owned(),
            },
            password: password.to_owned(),
        }
    }
}

impl IdentityProvider for MockIdentityProvider {
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedIdentity>, ApiError> {
        Ok((email == self.identity.email && password == self.password)
            .then(|| self.identity.clone()))
    }
}
