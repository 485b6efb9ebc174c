//! Subcommands and their dispatch onto the client services.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};

use mt_client::MediTurnos;
use mt_common::{
    ChangePasswordRequest, ExpressAppointmentRequest, MedicalHistory, NewMedicalHistory, NewReview,
    RegisterRequest, Role,
};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MEDITURNOS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami {
        /// Print the stored profile without calling the backend
        #[arg(long)]
        offline: bool,
    },
    /// Create an account
    Register(RegisterArgs),
    /// Email a password recovery code
    RecoverPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password using a recovery code
    ChangePassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
        #[arg(long, env = "MEDITURNOS_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
    /// Show the landing-page summary
    Home,
    #[command(subcommand)]
    Patients(PatientsCommand),
    #[command(subcommand)]
    History(HistoryCommand),
    #[command(subcommand)]
    Reviews(ReviewsCommand),
    #[command(subcommand)]
    Payments(PaymentsCommand),
    #[command(subcommand)]
    Express(ExpressCommand),
    /// Print an example configuration file
    Config,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "MEDITURNOS_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long, value_parser = parse_role, default_value = "paciente")]
    role: Role,
    #[arg(long)]
    dni: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    specialty: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

/// Linked patients and blocked users
#[derive(Subcommand, Debug)]
pub enum PatientsCommand {
    Linked,
    Blocked,
    Block { email: String },
    Unblock { email: String },
}

/// Medical histories
#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Every history you wrote
    Mine,
    /// A patient's history
    Get { patient_email: String },
    Create {
        patient_email: String,
        #[arg(long)]
        diagnosis: String,
        #[arg(long)]
        treatment: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Update {
        id: i64,
        patient_email: String,
        #[arg(long)]
        diagnosis: Option<String>,
        #[arg(long)]
        treatment: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete { id: i64, patient_email: String },
}

/// Professional reviews
#[derive(Subcommand, Debug)]
pub enum ReviewsCommand {
    /// Every review, approved or not (admin)
    All,
    Approve { id: i64 },
    Delete { id: i64 },
    /// Reviews of one professional
    Professional { email: String },
    /// Review an appointment
    Create {
        appointment_id: i64,
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// The review left for an appointment
    Get { appointment_id: i64 },
}

/// Appointment payments
#[derive(Subcommand, Debug)]
pub enum PaymentsCommand {
    Mine,
    Professional,
    Pay { appointment_id: i64 },
}

/// Express appointments
#[derive(Subcommand, Debug)]
pub enum ExpressCommand {
    /// Request an appointment without an account
    Request {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        specialty: String,
        #[arg(long)]
        reason: Option<String>,
    },
    Accept { appointment_id: i64 },
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::parse(raw).ok_or_else(|| "role must not be empty".to_string())
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

pub async fn execute(client: &MediTurnos, command: Command) -> Result<Value> {
    match command {
        Command::Login { email, password } => {
            to_json(client.auth().login(&email, &password).await?)
        }
        Command::Logout => {
            client.auth().logout();
            Ok(json!({"message": "Sesión cerrada"}))
        }
        Command::Whoami { offline: true } => match client.tokens().get_user() {
            Some(user) => to_json(user),
            None => bail!("No hay una sesión guardada"),
        },
        Command::Whoami { offline: false } => {
            if !client.tokens().has_access_token() {
                bail!("No hay una sesión guardada");
            }
            to_json(client.auth().current_user().await?)
        }
        Command::Register(args) => {
            let request = RegisterRequest {
                email: args.email,
                password: args.password,
                first_name: args.first_name,
                last_name: args.last_name,
                dni: args.dni,
                phone: args.phone,
                role: args.role,
                specialty: args.specialty,
                description: args.description,
            };
            match client.auth().register(&request).await? {
                Some(profile) => to_json(profile),
                None => Ok(json!({"message": "Cuenta creada"})),
            }
        }
        Command::RecoverPassword { email } => Ok(client.auth().recover_password(&email).await?),
        Command::ChangePassword {
            email,
            code,
            new_password,
        } => {
            let request = ChangePasswordRequest {
                email,
                code,
                new_password,
            };
            Ok(client.auth().change_password(&request).await?)
        }
        Command::Home => Ok(client.auth().home().await?),
        Command::Patients(command) => patients(client, command).await,
        Command::History(command) => history(client, command).await,
        Command::Reviews(command) => reviews(client, command).await,
        Command::Payments(command) => payments(client, command).await,
        Command::Express(command) => express(client, command).await,
        Command::Config => bail!("config is handled before the client is created"),
    }
}

async fn patients(client: &MediTurnos, command: PatientsCommand) -> Result<Value> {
    let patients = client.patients();
    match command {
        PatientsCommand::Linked => to_json(patients.linked().await?),
        PatientsCommand::Blocked => to_json(patients.blocked().await?),
        PatientsCommand::Block { email } => Ok(patients.block(&email).await?),
        PatientsCommand::Unblock { email } => Ok(patients.unblock(&email).await?),
    }
}

async fn history(client: &MediTurnos, command: HistoryCommand) -> Result<Value> {
    let history = client.history();
    match command {
        HistoryCommand::Mine => to_json(history.mine().await?),
        HistoryCommand::Get { patient_email } => match history.for_patient(&patient_email).await? {
            Some(record) => to_json(record),
            None => Ok(json!({"message": "El paciente todavía no tiene historial clínico"})),
        },
        HistoryCommand::Create {
            patient_email,
            diagnosis,
            treatment,
            notes,
        } => {
            let record = NewMedicalHistory {
                patient_email,
                diagnosis,
                treatment,
                notes,
            };
            Ok(history.create(&record).await?)
        }
        HistoryCommand::Update {
            id,
            patient_email,
            diagnosis,
            treatment,
            notes,
        } => {
            let record = MedicalHistory {
                id: Some(id),
                patient_email,
                professional_email: None,
                diagnosis,
                treatment,
                notes,
                date: None,
            };
            Ok(history.update(&record).await?)
        }
        HistoryCommand::Delete { id, patient_email } => {
            Ok(history.delete(id, &patient_email).await?)
        }
    }
}

async fn reviews(client: &MediTurnos, command: ReviewsCommand) -> Result<Value> {
    let reviews = client.reviews();
    match command {
        ReviewsCommand::All => to_json(reviews.all().await?),
        ReviewsCommand::Approve { id } => Ok(reviews.approve(id).await?),
        ReviewsCommand::Delete { id } => Ok(reviews.delete(id).await?),
        ReviewsCommand::Professional { email } => to_json(reviews.for_professional(&email).await?),
        ReviewsCommand::Create {
            appointment_id,
            rating,
            comment,
        } => {
            let review = NewReview {
                appointment_id,
                rating,
                comment,
            };
            Ok(reviews.create(&review).await?)
        }
        ReviewsCommand::Get { appointment_id } => {
            to_json(reviews.for_appointment(appointment_id).await?)
        }
    }
}

async fn payments(client: &MediTurnos, command: PaymentsCommand) -> Result<Value> {
    let payments = client.payments();
    match command {
        PaymentsCommand::Mine => to_json(payments.mine().await?),
        PaymentsCommand::Professional => to_json(payments.professional().await?),
        PaymentsCommand::Pay { appointment_id } => Ok(payments.pay(appointment_id).await?),
    }
}

async fn express(client: &MediTurnos, command: ExpressCommand) -> Result<Value> {
    let appointments = client.appointments();
    match command {
        ExpressCommand::Request {
            first_name,
            last_name,
            email,
            phone,
            specialty,
            reason,
        } => {
            let request = ExpressAppointmentRequest {
                first_name,
                last_name,
                email,
                phone,
                specialty,
                reason,
            };
            Ok(appointments.request_express(&request).await?)
        }
        ExpressCommand::Accept { appointment_id } => {
            Ok(appointments.accept_express(appointment_id).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(subcommand)]
        command: Command,
    }

    #[test]
    fn test_parse_nested_subcommand() {
        let cli = Cli::try_parse_from(["mt-cli", "history", "get", "ana@b.com"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::History(HistoryCommand::Get { ref patient_email }) if patient_email == "ana@b.com"
        ));
    }

    #[test]
    fn test_register_role_is_parsed() {
        let cli = Cli::try_parse_from([
            "mt-cli",
            "register",
            "--email",
            "doc@b.com",
            "--password",
            "x",
            "--first-name",
            "Laura",
            "--last-name",
            "Gómez",
            "--role",
            "PROFESIONAL",
        ])
        .unwrap();
        match cli.command {
            Command::Register(args) => assert_eq!(args.role, Role::Profesional),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rating_out_of_range_is_rejected() {
        let result = Cli::try_parse_from(["mt-cli", "reviews", "create", "42", "--rating", "9"]);
        assert!(result.is_err());
    }
}
