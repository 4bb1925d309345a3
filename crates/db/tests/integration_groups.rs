//! Integration-Tests fuer GruppenRepository (In-Memory SQLite)

use plauder_core::{GroupId, GruppenRolle, NachrichtenTyp, UserId};
use plauder_db::{
    models::{NeueGruppenNachricht, NeuerBenutzer, NeuesMitglied},
    GruppenRepository, SqliteDb,
};

async fn db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

async fn benutzer(db: &SqliteDb, name: &str) -> UserId {
    db.benutzer_anlegen(NeuerBenutzer {
        username: name,
        full_name: None,
        avatar: None,
    })
    .await
    .unwrap()
    .id
}

fn nachricht<'a>(gruppe: GroupId, sender: UserId, erwaehnt: &'a [UserId]) -> NeueGruppenNachricht<'a> {
    NeueGruppenNachricht {
        group_id: gruppe,
        sender_id: sender,
        sender_name: "Chefin",
        sender_nickname: Some("Chefin"),
        sender_full_name: None,
        sender_avatar: None,
        content: "Treffen um 10",
        message_type: NachrichtenTyp::Text,
        file_name: None,
        quoted_message_id: None,
        quoted_message_content: None,
        mentioned_user_ids: erwaehnt,
        mentions: Some("@ben"),
        voice_duration: None,
    }
}

#[tokio::test]
async fn gruppe_mit_besitzer_und_mitgliedern() {
    let db = db().await;
    let anna = benutzer(&db, "anna").await;
    let ben = benutzer(&db, "ben").await;
    let cem = benutzer(&db, "cem").await;

    let gruppe = db.gruppe_anlegen("Team", anna).await.unwrap();
    db.mitglied_hinzufuegen(NeuesMitglied {
        group_id: gruppe,
        user_id: ben,
        role: GruppenRolle::Member,
        nickname: Some("Benni"),
    })
    .await
    .unwrap();

    assert_eq!(db.mitglieds_rolle(gruppe, anna).await.unwrap(), Some(GruppenRolle::Owner));
    assert_eq!(db.mitglieds_rolle(gruppe, ben).await.unwrap(), Some(GruppenRolle::Member));
    assert_eq!(db.mitglieds_rolle(gruppe, cem).await.unwrap(), None);

    let ids = db.mitglieder_ids(gruppe).await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&anna) && ids.contains(&ben));

    let anzeige = db.mitglied_anzeige(gruppe, ben).await.unwrap().unwrap();
    assert_eq!(anzeige.anzeigename(), "Benni");
    assert!(db.mitglied_anzeige(gruppe, cem).await.unwrap().is_none());
}

#[tokio::test]
async fn aufloesen_und_stummschalten() {
    let db = db().await;
    let anna = benutzer(&db, "anna").await;
    let gruppe = db.gruppe_anlegen("Team", anna).await.unwrap();

    assert!(!db.ist_aufgeloest(gruppe).await.unwrap());
    assert!(!db.ist_aufgeloest(GroupId(404)).await.unwrap());

    assert!(!db.ist_stumm(gruppe, anna).await.unwrap());
    db.stumm_schalten(gruppe, anna, true).await.unwrap();
    assert!(db.ist_stumm(gruppe, anna).await.unwrap());

    db.gruppe_aufloesen(gruppe).await.unwrap();
    assert!(db.ist_aufgeloest(gruppe).await.unwrap());
}

#[tokio::test]
async fn gruppennachricht_speichern_und_lesen() {
    let db = db().await;
    let anna = benutzer(&db, "anna").await;
    let ben = benutzer(&db, "ben").await;
    let fremd = benutzer(&db, "fremd").await;
    let gruppe = db.gruppe_anlegen("Team", anna).await.unwrap();
    db.mitglied_hinzufuegen(NeuesMitglied {
        group_id: gruppe,
        user_id: ben,
        role: GruppenRolle::Member,
        nickname: None,
    })
    .await
    .unwrap();

    let erwaehnt = [ben];
    let msg = db
        .gruppen_nachricht_erstellen(nachricht(gruppe, anna, &erwaehnt))
        .await
        .unwrap();
    assert_eq!(msg.mentioned_user_ids, vec![ben]);
    assert_eq!(msg.sender_name, "Chefin");

    // Absender und Nicht-Mitglieder zaehlen nicht
    assert!(db.gruppen_nachricht_gelesen(msg.id, anna).await.unwrap().is_none());
    assert!(db.gruppen_nachricht_gelesen(msg.id, fremd).await.unwrap().is_none());

    let gelesen = db.gruppen_nachricht_gelesen(msg.id, ben).await.unwrap().unwrap();
    assert_eq!(gelesen.id, msg.id);
    assert_eq!(gelesen.mentioned_user_ids, vec![ben]);

    // zweites Lesen ist kein Zustandswechsel
    assert!(db.gruppen_nachricht_gelesen(msg.id, ben).await.unwrap().is_none());
    assert_eq!(db.gruppen_leser_anzahl(msg.id).await.unwrap(), 1);
}
