//! Datenbank-Datensaetze in ausgehende Nutzlasten umwandeln

use plauder_db::models::{BenutzerRecord, GruppenNachrichtRecord, NachrichtRecord};
use plauder_protocol::control::{
    BenutzerKurzinfo, GruppenNachrichtDaten, NachrichtDaten, StatusInfo,
};

pub fn nachricht_daten(r: &NachrichtRecord) -> NachrichtDaten {
    NachrichtDaten {
        id: r.id,
        sender_id: r.sender_id,
        receiver_id: r.receiver_id,
        sender_name: r.sender_name.clone(),
        receiver_name: r.receiver_name.clone(),
        sender_avatar: r.sender_avatar.clone(),
        receiver_avatar: r.receiver_avatar.clone(),
        content: r.content.clone(),
        message_type: r.message_type,
        file_name: r.file_name.clone(),
        quoted_message_id: r.quoted_message_id,
        quoted_message_content: r.quoted_message_content.clone(),
        call_type: r.call_type.clone(),
        voice_duration: r.voice_duration,
        is_read: r.is_read,
        created_at: r.created_at,
    }
}

pub fn gruppen_nachricht_daten(r: &GruppenNachrichtRecord) -> GruppenNachrichtDaten {
    GruppenNachrichtDaten {
        id: r.id,
        group_id: r.group_id,
        sender_id: r.sender_id,
        sender_name: r.sender_name.clone(),
        sender_avatar: r.sender_avatar.clone(),
        content: r.content.clone(),
        message_type: r.message_type,
        file_name: r.file_name.clone(),
        quoted_message_id: r.quoted_message_id,
        quoted_message_content: r.quoted_message_content.clone(),
        mentioned_user_ids: r.mentioned_user_ids.clone(),
        mentions: r.mentions.clone(),
        voice_duration: r.voice_duration,
        created_at: r.created_at,
    }
}

pub fn kurzinfo(b: &BenutzerRecord) -> BenutzerKurzinfo {
    BenutzerKurzinfo {
        user_id: b.id,
        username: b.username.clone(),
        full_name: b.full_name.clone(),
        avatar: b.avatar.clone(),
    }
}

pub fn status_info(b: &BenutzerRecord) -> StatusInfo {
    StatusInfo {
        user_id: b.id,
        username: b.username.clone(),
        full_name: b.full_name.clone(),
        status: b.status,
    }
}
