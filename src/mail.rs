//! Best-effort email delivery of reminder reports over an SMTP relay with
//! STARTTLS.

use crate::config::Smtp;
use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fmt;

/// Sends `body` to `to`. Every failure is logged and reported as `false`;
/// delivery never aborts the caller.
pub fn send_report(smtp: &Smtp, to: &str, subject: &str, body: String) -> bool {
    match send(smtp, to, subject, body) {
        Ok(()) => {
            log::info!("reminder sent to {}", to);
            true
        }
        Err(err) => {
            log::warn!("failed to send email: {}", err);
            false
        }
    }
}

fn send(smtp: &Smtp, to: &str, subject: &str, body: String) -> Result<()> {
    let message = Message::builder()
        .from(smtp.from_email.parse()?)
        .to(to.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body)?;

    let mut transport = SmtpTransport::starttls_relay(&smtp.server)?.port(smtp.port);
    if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
        transport = transport.credentials(Credentials::new(username.clone(), password.clone()));
    }
    transport.build().send(&message)?;
    Ok(())
}

/// The result of a fallible delivery.
type Result<T> = std::result::Result<T, Error>;

/// Represents a problem delivering an email.
#[derive(Debug)]
pub enum Error {
    /// Returned when the sender or recipient isn't a valid address.
    Address(AddressError),

    /// Returned when the message can't be assembled.
    Message(lettre::error::Error),

    /// Returned when connecting, authenticating, or sending fails.
    Smtp(lettre::transport::smtp::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Address(err) => write!(f, "Invalid email address: {}", err),
            Error::Message(err) => write!(f, "Building message: {}", err),
            Error::Smtp(err) => write!(f, "SMTP: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Address(err) => Some(err),
            Error::Message(err) => Some(err),
            Error::Smtp(err) => Some(err),
        }
    }
}

impl From<AddressError> for Error {
    fn from(err: AddressError) -> Error {
        Error::Address(err)
    }
}

impl From<lettre::error::Error> for Error {
    fn from(err: lettre::error::Error) -> Error {
        Error::Message(err)
    }
}

impl From<lettre::transport::smtp::Error> for Error {
    fn from(err: lettre::transport::smtp::Error) -> Error {
        Error::Smtp(err)
    }
}
