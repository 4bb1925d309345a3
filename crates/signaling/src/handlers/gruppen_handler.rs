//! Gruppennachrichten
//!
//! Pruefreihenfolge: Gruppe aufgeloest -> Mitgliedschaft -> stummgeschaltet.
//! Zugestellt wird an alle Online-Mitglieder ausser dem Absender.

use plauder_core::{GroupId, UserId};
use plauder_db::models::{MitgliedsAnzeige, NeueGruppenNachricht};
use plauder_db::DbResult;
use plauder_protocol::control::GruppenNachrichtSenden;
use plauder_protocol::{kodieren, Ausgehend, Fehlermeldung};

use super::antworten;
use crate::server_state::SignalingState;
use crate::umwandlung::gruppen_nachricht_daten;

/// Grund warum eine Gruppennachricht abgelehnt wird
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GruppenAblehnung {
    Aufgeloest,
    KeinMitglied,
    Stummgeschaltet,
}

impl GruppenAblehnung {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Aufgeloest => "group_disbanded",
            Self::KeinMitglied => "not_member",
            Self::Stummgeschaltet => "muted",
        }
    }

    pub fn meldung(&self) -> &'static str {
        match self {
            Self::Aufgeloest => "Die Gruppe wurde aufgeloest",
            Self::KeinMitglied => "Sie sind kein Mitglied dieser Gruppe",
            Self::Stummgeschaltet => "Sie wurden in dieser Gruppe stummgeschaltet",
        }
    }

    fn umschlag(self) -> Ausgehend {
        Ausgehend::GruppenNachrichtFehler(Fehlermeldung::neu(self.code(), self.meldung()))
    }
}

async fn pruefen(
    state: &SignalingState,
    gruppe: GroupId,
    sender: UserId,
) -> DbResult<Result<MitgliedsAnzeige, GruppenAblehnung>> {
    if state.db.ist_aufgeloest(gruppe).await? {
        return Ok(Err(GruppenAblehnung::Aufgeloest));
    }
    if state.db.mitglieds_rolle(gruppe, sender).await?.is_none() {
        return Ok(Err(GruppenAblehnung::KeinMitglied));
    }
    if state.db.ist_stumm(gruppe, sender).await? {
        return Ok(Err(GruppenAblehnung::Stummgeschaltet));
    }
    Ok(state
        .db
        .mitglied_anzeige(gruppe, sender)
        .await?
        .ok_or(GruppenAblehnung::KeinMitglied))
}

pub async fn handle_gruppen_nachricht(
    anfrage: GruppenNachrichtSenden,
    sender: UserId,
    state: &SignalingState,
) {
    let gruppe = anfrage.group_id;

    let anzeige = match pruefen(state, gruppe, sender).await {
        Ok(Ok(anzeige)) => anzeige,
        Ok(Err(ablehnung)) => {
            tracing::debug!(sender = %sender, gruppe = %gruppe, grund = ablehnung.code(), "Gruppennachricht abgelehnt");
            antworten(state, sender, ablehnung.umschlag()).await;
            return;
        }
        Err(e) => {
            tracing::error!(sender = %sender, gruppe = %gruppe, fehler = %e, "Gruppenpruefung fehlgeschlagen");
            return;
        }
    };

    let record = match state
        .db
        .gruppen_nachricht_erstellen(NeueGruppenNachricht {
            group_id: gruppe,
            sender_id: sender,
            sender_name: anzeige.anzeigename(),
            sender_nickname: anzeige.nickname.as_deref(),
            sender_full_name: anzeige.full_name.as_deref(),
            sender_avatar: anzeige.avatar.as_deref(),
            content: &anfrage.content,
            message_type: anfrage.message_type,
            file_name: anfrage.file_name.as_deref(),
            quoted_message_id: anfrage.quoted_message_id,
            quoted_message_content: anfrage.quoted_message_content.as_deref(),
            mentioned_user_ids: &anfrage.mentioned_user_ids,
            mentions: anfrage.mentions.as_deref(),
            voice_duration: anfrage.voice_duration,
        })
        .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(sender = %sender, gruppe = %gruppe, fehler = %e, "Gruppennachricht nicht gespeichert");
            return;
        }
    };

    match state.db.mitglieder_ids(gruppe).await {
        Ok(mitglieder) => {
            match kodieren(&Ausgehend::GruppenNachricht(gruppen_nachricht_daten(&record))) {
                Ok(daten) => {
                    let versuche = state
                        .registry
                        .an_menge_senden(mitglieder, daten, Some(sender))
                        .await;
                    tracing::debug!(
                        message_id = %record.id,
                        gruppe = %gruppe,
                        versuche,
                        "Gruppennachricht verteilt"
                    );
                }
                Err(e) => tracing::error!(fehler = %e, "Gruppennachricht nicht kodierbar"),
            }
        }
        // gespeichert ist sie trotzdem, Mitglieder sehen sie beim Nachladen
        Err(e) => tracing::error!(gruppe = %gruppe, fehler = %e, "Mitglieder nicht lesbar"),
    }

    antworten(state, sender, Ausgehend::gruppe_gesendet(record.id, gruppe)).await;
}
