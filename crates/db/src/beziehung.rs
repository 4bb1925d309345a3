//! Bewertung von Kontaktbeziehungen fuer private Nachrichten
//!
//! Zwischen zwei Benutzern existieren bis zu zwei gerichtete Zeilen. Beide
//! werden betrachtet; der restriktivste Zustand gewinnt:
//!
//!   1. Blockiert (erst durch den Empfaenger, dann durch den Absender)
//!   2. Geloescht (erst durch den Empfaenger, dann durch den Absender)
//!   3. Anfrage abgelehnt
//!   4. Anfrage ausstehend
//!   5. Keine Beziehung
//!
//! Nur wenn nichts davon zutrifft darf gesendet werden.

use plauder_core::{Freigabe, UserId};

use crate::models::BeziehungRecord;

/// Grund warum eine private Nachricht nicht zugestellt werden darf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ablehnung {
    BlockiertVonEmpfaenger,
    EmpfaengerBlockiert,
    GeloeschtVonEmpfaenger,
    EmpfaengerGeloescht,
    AnfrageAbgelehnt,
    AnfrageAusstehend,
    KeineBeziehung,
}

impl Ablehnung {
    /// Maschinenlesbarer Code fuer `message_error`
    pub fn code(&self) -> &'static str {
        match self {
            Self::BlockiertVonEmpfaenger => "blocked_by_receiver",
            Self::EmpfaengerBlockiert => "receiver_blocked",
            Self::GeloeschtVonEmpfaenger => "deleted_by_receiver",
            Self::EmpfaengerGeloescht => "receiver_deleted",
            Self::AnfrageAbgelehnt => "request_rejected",
            Self::AnfrageAusstehend => "request_pending",
            Self::KeineBeziehung => "not_friends",
        }
    }

    /// Lesbarer Text fuer den Absender
    pub fn meldung(&self) -> &'static str {
        match self {
            Self::BlockiertVonEmpfaenger => {
                "Dieser Kontakt hat Sie blockiert, Nachrichten koennen nicht gesendet werden"
            }
            Self::EmpfaengerBlockiert => {
                "Sie haben diesen Kontakt blockiert, Nachrichten koennen nicht gesendet werden"
            }
            Self::GeloeschtVonEmpfaenger => {
                "Dieser Kontakt hat Sie entfernt, Nachrichten koennen nicht gesendet werden"
            }
            Self::EmpfaengerGeloescht => {
                "Sie haben diesen Kontakt entfernt, Nachrichten koennen nicht gesendet werden"
            }
            Self::AnfrageAbgelehnt => "Ihre Kontaktanfrage wurde abgelehnt",
            Self::AnfrageAusstehend => "Ihre Kontaktanfrage wurde noch nicht bestaetigt",
            Self::KeineBeziehung => "Sie sind mit diesem Benutzer nicht verbunden",
        }
    }
}

impl std::fmt::Display for Ablehnung {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Prueft ob `sender` an `empfaenger` schreiben darf
pub fn bewerten(
    sender: UserId,
    empfaenger: UserId,
    zeilen: &[BeziehungRecord],
) -> Result<(), Ablehnung> {
    if zeilen.is_empty() {
        return Err(Ablehnung::KeineBeziehung);
    }

    let blockierer: Vec<UserId> = zeilen.iter().filter_map(|z| z.blockiert_von()).collect();
    if blockierer.contains(&empfaenger) {
        return Err(Ablehnung::BlockiertVonEmpfaenger);
    }
    if blockierer.contains(&sender) {
        return Err(Ablehnung::EmpfaengerBlockiert);
    }

    let loescher: Vec<UserId> = zeilen.iter().filter_map(|z| z.geloescht_von()).collect();
    if loescher.contains(&empfaenger) {
        return Err(Ablehnung::GeloeschtVonEmpfaenger);
    }
    if loescher.contains(&sender) {
        return Err(Ablehnung::EmpfaengerGeloescht);
    }

    if zeilen.iter().any(|z| z.approval_status == Freigabe::Rejected) {
        return Err(Ablehnung::AnfrageAbgelehnt);
    }
    if zeilen.iter().any(|z| z.approval_status == Freigabe::Pending) {
        return Err(Ablehnung::AnfrageAusstehend);
    }

    Ok(())
}
