//! API services
//!
//! One method per backend operation. Reads go through the query cache under
//! the keys in [`keys`]; writes invalidate the keys whose data they change.

use crate::cache::QueryOptions;
use std::time::Duration;

mod appointments;
mod auth;
mod history;
mod patients;
mod payments;
mod reviews;

pub use appointments::AppointmentsApi;
pub use auth::AuthApi;
pub use history::HistoryApi;
pub use patients::PatientsApi;
pub use payments::PaymentsApi;
pub use reviews::ReviewsApi;

/// Backend endpoint paths
pub mod paths {
    pub const LOGIN: &str = "/login";
    pub const REGISTER: &str = "/register";
    pub const RECOVER_PASSWORD: &str = "/enviarMailRecuperarClave";
    pub const CHANGE_PASSWORD: &str = "/cambiarClave";
    pub const CURRENT_USER: &str = "/obtenerUsuario";
    pub const HOME: &str = "/home";

    pub const LINKED_PATIENTS: &str = "/obtenerListaDePacientesVinculados";
    pub const BLOCKED_USERS: &str = "/verBloqueados";
    pub const BLOCK_USER: &str = "/bloquearUsuario";
    pub const UNBLOCK_USER: &str = "/desbloquearUsuario";

    pub const CREATE_HISTORY: &str = "/nuevoHistorialClinico";
    pub const UPDATE_HISTORY: &str = "/actualizarHistorialClinicoDelPaciente";
    pub const DELETE_HISTORY: &str = "/eliminarHistorialClinico";
    pub const PATIENT_HISTORY: &str = "/obtenerHistorialClinicoDelPaciente";
    pub const MY_HISTORIES: &str = "/obtenerTodosMisHistorialesClinicos";

    pub const ALL_REVIEWS: &str = "/verTodasLasResenias";
    pub const APPROVE_REVIEW: &str = "/aprobarResenia";
    pub const DELETE_REVIEW: &str = "/eliminarResenia";
    pub const PROFESSIONAL_REVIEWS: &str = "/verReseniasDeProfesional";
    pub const CREATE_REVIEW: &str = "/crearResenia";
    pub const APPOINTMENT_REVIEW: &str = "/obtenerResenia";

    pub const MY_PAYMENTS: &str = "/VerPagos";
    pub const PROFESSIONAL_PAYMENTS: &str = "/VerPagosProfesional";
    pub const PAY_APPOINTMENT: &str = "/PagarTurno";

    pub const REQUEST_EXPRESS: &str = "/solicitarNuevoTurnoExpress";
    pub const ACCEPT_EXPRESS: &str = "/aceptarTurnoExpress";
}

/// Query keys
pub mod keys {
    use crate::cache::QueryKey;

    pub fn current_user() -> QueryKey {
        QueryKey::new("usuario")
    }

    pub fn home() -> QueryKey {
        QueryKey::new("home")
    }

    pub fn linked_patients() -> QueryKey {
        QueryKey::new("pacientesVinculados")
    }

    pub fn blocked_users() -> QueryKey {
        QueryKey::new("bloqueados")
    }

    pub fn my_histories() -> QueryKey {
        QueryKey::new("historiales")
    }

    /// Every patient's history when `email` is `None`.
    pub fn patient_history(email: Option<&str>) -> QueryKey {
        let key = QueryKey::new("historial");
        match email {
            Some(email) => key.with(email),
            None => key,
        }
    }

    pub fn all_reviews() -> QueryKey {
        QueryKey::new("resenias")
    }

    /// Every professional's reviews when `email` is `None`.
    pub fn professional_reviews(email: Option<&str>) -> QueryKey {
        let key = QueryKey::new("reseniasProfesional");
        match email {
            Some(email) => key.with(email),
            None => key,
        }
    }

    pub fn appointment_review(appointment_id: i64) -> QueryKey {
        QueryKey::new("resenia").with(appointment_id)
    }

    pub fn my_payments() -> QueryKey {
        QueryKey::new("pagos")
    }

    pub fn professional_payments() -> QueryKey {
        QueryKey::new("pagosProfesional")
    }

    pub fn appointments() -> QueryKey {
        QueryKey::new("turnos")
    }
}

const fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

pub(crate) const CURRENT_USER_QUERY: QueryOptions = QueryOptions::new(secs(300), secs(600), 0);
pub(crate) const HOME_QUERY: QueryOptions = QueryOptions::new(secs(60), secs(300), 1);
pub(crate) const PATIENT_LIST_QUERY: QueryOptions = QueryOptions::new(secs(60), secs(300), 1);
pub(crate) const PATIENT_HISTORY_QUERY: QueryOptions = QueryOptions::new(secs(30), secs(300), 0);
pub(crate) const HISTORY_LIST_QUERY: QueryOptions = QueryOptions::new(secs(60), secs(300), 1);
pub(crate) const ALL_REVIEWS_QUERY: QueryOptions = QueryOptions::new(secs(30), secs(300), 1);
pub(crate) const REVIEW_QUERY: QueryOptions = QueryOptions::new(secs(60), secs(300), 1);
pub(crate) const APPOINTMENT_REVIEW_QUERY: QueryOptions = QueryOptions::new(secs(60), secs(300), 0);
pub(crate) const PAYMENTS_QUERY: QueryOptions = QueryOptions::new(secs(60), secs(300), 1);
