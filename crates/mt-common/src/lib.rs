//! MediTurnos shared types
//!
//! Domain records exchanged with the MediTurnos backend. Field names on the
//! wire follow the backend's Spanish camelCase JSON; the Rust side uses
//! English names with explicit renames.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

pub mod logging;

// ============================================================================
// Roles
// ============================================================================

/// Canonical user role.
///
/// The backend is inconsistent about how it sends roles, so every shape is
/// funnelled through [`RoleField`] and [`resolve_role`] exactly once, at the
/// API boundary. Nothing downstream inspects raw role fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Paciente,
    Profesional,
    Admin,
    Other(String),
}

impl Role {
    /// Parse a role name. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Role> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let role = match trimmed.to_lowercase().as_str() {
            "paciente" | "patient" => Role::Paciente,
            "profesional" | "professional" => Role::Profesional,
            "admin" | "administrador" => Role::Admin,
            other => Role::Other(other.to_string()),
        };
        Some(role)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Paciente => "paciente",
            Role::Profesional => "profesional",
            Role::Admin => "admin",
            Role::Other(name) => name,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn is_professional(&self) -> bool {
        matches!(self, Role::Profesional)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let field = RoleField::deserialize(deserializer)?;
        field
            .into_role()
            .ok_or_else(|| serde::de::Error::custom("unrecognized role"))
    }
}

/// The shapes a role can take on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoleField {
    /// `{"name": "ADMIN", ...}`
    Named { name: String },
    /// `"paciente"`
    Plain(String),
    /// Anything else (numbers, objects without a name). Resolves to nothing.
    Unrecognized(Value),
}

impl RoleField {
    pub fn into_role(self) -> Option<Role> {
        match self {
            RoleField::Named { name } => Role::parse(&name),
            RoleField::Plain(name) => Role::parse(&name),
            RoleField::Unrecognized(_) => None,
        }
    }

    fn is_structured(&self) -> bool {
        matches!(self, RoleField::Named { .. })
    }
}

/// Resolve a role from the fields a payload may carry.
///
/// Priority: structured `role.name`, then a bare `role` string, then the
/// legacy `rol` field.
pub fn resolve_role(role: Option<RoleField>, legacy: Option<RoleField>) -> Option<Role> {
    let (structured, plain) = match role {
        Some(field) if field.is_structured() => (field.into_role(), None),
        Some(field) => (None, field.into_role()),
        None => (None, None),
    };

    structured
        .or(plain)
        .or_else(|| legacy.and_then(RoleField::into_role))
}

// ============================================================================
// Users
// ============================================================================

/// Denormalized user record, as persisted by the token store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawUserProfile")]
pub struct UserProfile {
    pub email: String,
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "apellido", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dni: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "especialidad", skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UserProfile {
    /// Minimal profile for when the backend told us nothing but the email.
    ///
    /// The display name is the local part of the address.
    pub fn placeholder(email: &str, role: Option<Role>) -> Self {
        let local_part = email.split('@').next().unwrap_or(email);
        Self {
            email: email.to_string(),
            first_name: Some(local_part.to_string()),
            last_name: None,
            dni: None,
            phone: None,
            role,
            specialty: None,
            description: None,
        }
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self.email.clone(),
        }
    }
}

/// Wire shape of a user. Accepts every role variant the backend emits.
#[derive(Debug, Default, Deserialize)]
struct RawUserProfile {
    #[serde(default, alias = "mail")]
    email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    nombre: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    apellido: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    dni: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    telefono: Option<String>,
    #[serde(default)]
    role: Option<RoleField>,
    #[serde(default)]
    rol: Option<RoleField>,
    #[serde(default, deserialize_with = "lenient_string")]
    especialidad: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    descripcion: Option<String>,
}

impl From<RawUserProfile> for UserProfile {
    fn from(raw: RawUserProfile) -> Self {
        Self {
            email: raw.email,
            first_name: raw.nombre,
            last_name: raw.apellido,
            dni: raw.dni,
            phone: raw.telefono,
            role: resolve_role(raw.role, raw.rol),
            specialty: raw.especialidad,
            description: raw.descripcion,
        }
    }
}

/// Response to login, register and password change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default, alias = "accessToken")]
    pub token: Option<String>,
    #[serde(default, alias = "usuario")]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub role: Option<RoleField>,
    #[serde(default)]
    pub rol: Option<RoleField>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dni: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "especialidad", skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoverPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub email: String,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nuevaClave")]
    pub new_password: String,
}

/// Body for block/unblock.
#[derive(Debug, Clone, Serialize)]
pub struct UserEmailRequest {
    pub email: String,
}

// ============================================================================
// Medical histories
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalHistory {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "pacienteMail", default)]
    pub patient_email: String,
    #[serde(rename = "profesionalMail", default, skip_serializing_if = "Option::is_none")]
    pub professional_email: Option<String>,
    #[serde(rename = "diagnostico", default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(rename = "tratamiento", default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    #[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "fecha", default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMedicalHistory {
    #[serde(rename = "pacienteMail")]
    pub patient_email: String,
    #[serde(rename = "diagnostico")]
    pub diagnosis: String,
    #[serde(rename = "tratamiento", skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    #[serde(rename = "observaciones", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteMedicalHistoryRequest {
    pub id: i64,
    #[serde(rename = "pacienteMail")]
    pub patient_email: String,
}

// ============================================================================
// Reviews
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(rename = "idTurno", default, deserialize_with = "lenient_id")]
    pub appointment_id: Option<i64>,
    #[serde(rename = "profesionalMail", default)]
    pub professional_email: Option<String>,
    #[serde(rename = "pacienteMail", default)]
    pub patient_email: Option<String>,
    #[serde(rename = "puntuacion", default, deserialize_with = "lenient_rating")]
    pub rating: Option<u8>,
    #[serde(rename = "comentario", default)]
    pub comment: Option<String>,
    #[serde(rename = "aprobada", default, deserialize_with = "lenient_bool")]
    pub approved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    #[serde(rename = "idTurno")]
    pub appointment_id: i64,
    #[serde(rename = "puntuacion")]
    pub rating: u8,
    #[serde(rename = "comentario")]
    pub comment: String,
}

/// Body for operations that address a record by id.
#[derive(Debug, Clone, Serialize)]
pub struct IdRequest {
    pub id: i64,
}

// ============================================================================
// Payments and appointments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(rename = "idTurno", default, deserialize_with = "lenient_id")]
    pub appointment_id: Option<i64>,
    #[serde(rename = "monto", default)]
    pub amount: Option<f64>,
    #[serde(rename = "estado", default)]
    pub status: Option<String>,
    #[serde(rename = "fecha", default)]
    pub date: Option<String>,
    #[serde(rename = "pacienteMail", default)]
    pub patient_email: Option<String>,
    #[serde(rename = "profesionalMail", default)]
    pub professional_email: Option<String>,
}

/// Body for operations that address an appointment.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentRequest {
    #[serde(rename = "idTurno")]
    pub appointment_id: i64,
}

/// Express appointment request; sent without credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressAppointmentRequest {
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    pub email: String,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "especialidad")]
    pub specialty: String,
    #[serde(rename = "motivo", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ============================================================================
// Lenient field decoding
// ============================================================================

/// Accept strings, numbers, or `{nombre|name: ...}` objects as a string.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map
            .get("nombre")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }))
}

/// Accept numeric ids sent either as numbers or as numeric strings.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// Ratings arrive as integers, floats or numeric strings. Anything else,
/// or a value outside `u8`, is no rating.
fn lenient_rating<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    });
    Ok(number
        .filter(|n| n.is_finite())
        .and_then(|n| u8::try_from(n.round() as i64).ok()))
}

/// `null` and unknown shapes read as `false`; `"true"`, `1` read as `true`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "si" | "sí"),
        _ => false,
    })
}
