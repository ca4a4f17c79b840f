use chrono::NaiveDate;
use contacts_core::{
    derive_mail, Contact, ContactRepository, ConnectionDescriptor, RepoError,
    SqliteContactRepository,
};
use rusqlite::Connection;
use std::path::Path;

fn file_repo(path: &Path) -> SqliteContactRepository {
    let url = format!("sqlite:{}", path.display());
    let descriptor = ConnectionDescriptor::new("sqlite", url, "", "").unwrap();
    let mut repo = SqliteContactRepository::with_descriptor(descriptor);
    repo.create_table().unwrap();
    repo
}

fn stored_mails(path: &Path) -> Vec<Option<String>> {
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare("SELECT mail FROM ContactPerson ORDER BY id;")
        .unwrap();
    let mails = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<rusqlite::Result<Vec<_>>>()
        .unwrap();
    mails
}

#[test]
fn batch_update_derives_mail_for_scenario_contacts() {
    let mut repo = SqliteContactRepository::with_descriptor(ConnectionDescriptor::in_memory());
    repo.create_table().unwrap();

    let mut ahmed = Contact::new("Ahmed Ali");
    ahmed.cellphone = Some("010-12345678".to_string());
    let ahmed_id = repo.insert(&ahmed).unwrap();
    let fatima_id = repo.insert(&Contact::new("Fatima Hassan")).unwrap();

    assert_eq!(repo.batch_update_emails().unwrap(), 2);

    let contacts = repo.list_all().unwrap();
    let mail_of = |id| {
        contacts
            .iter()
            .find(|contact| contact.id == Some(id))
            .and_then(|contact| contact.mail.clone())
    };
    assert_eq!(mail_of(ahmed_id).as_deref(), Some("Ahmed_Ali@edu.eg"));
    assert_eq!(mail_of(fatima_id).as_deref(), Some("Fatima_Hassan@edu.eg"));
}

#[test]
fn batch_update_changes_only_mail() {
    let mut repo = SqliteContactRepository::with_descriptor(ConnectionDescriptor::in_memory());
    repo.create_table().unwrap();

    let mut detailed = Contact::new("Abd El Rahman");
    detailed.nickname = Some("Abdo".to_string());
    detailed.address = Some("7 Nile Corniche, Aswan".to_string());
    detailed.work_phone = Some("097-555000".to_string());
    detailed.mail = Some("abdo@email.com".to_string());
    detailed.birthdate = NaiveDate::from_ymd_opt(1985, 12, 1);
    detailed.profession = Some("Architect".to_string());
    repo.insert(&detailed).unwrap();
    repo.insert(&Contact::new("Mona")).unwrap();
    repo.insert(&Contact::new("Sara  Mostafa")).unwrap();

    let before = repo.list_all().unwrap();
    repo.batch_update_emails().unwrap();
    let after = repo.list_all().unwrap();

    assert_eq!(before.len(), after.len());
    for old in &before {
        let new = after.iter().find(|contact| contact.id == old.id).unwrap();
        let expected = Contact {
            mail: Some(derive_mail(&old.name)),
            ..old.clone()
        };
        assert_eq!(new, &expected);
    }

    let sara = after.iter().find(|c| c.name == "Sara  Mostafa").unwrap();
    assert_eq!(sara.mail.as_deref(), Some("Sara__Mostafa@edu.eg"));
}

#[test]
fn batch_update_on_empty_table_updates_nothing() {
    let mut repo = SqliteContactRepository::with_descriptor(ConnectionDescriptor::in_memory());
    repo.create_table().unwrap();

    assert_eq!(repo.batch_update_emails().unwrap(), 0);
    assert!(repo.list_all().unwrap().is_empty());
}

#[test]
fn batch_update_is_repeatable() {
    let mut repo = SqliteContactRepository::with_descriptor(ConnectionDescriptor::in_memory());
    repo.create_table().unwrap();
    repo.insert(&Contact::new("Ahmed Ali")).unwrap();

    repo.batch_update_emails().unwrap();
    let first = repo.list_all().unwrap();
    repo.batch_update_emails().unwrap();
    let second = repo.list_all().unwrap();

    assert_eq!(first, second);
}

#[test]
fn failed_row_rolls_back_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contacts.db");
    let mut repo = file_repo(&path);

    let mut ahmed = Contact::new("Ahmed Ali");
    ahmed.mail = Some("ahmed.ali@email.com".to_string());
    repo.insert(&ahmed).unwrap();
    repo.insert(&Contact::new("Fatima Hassan")).unwrap();

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_fatima_mail
         BEFORE UPDATE OF mail ON ContactPerson
         WHEN NEW.name = 'Fatima Hassan'
         BEGIN
             SELECT RAISE(ABORT, 'mail update rejected');
         END;",
    )
    .unwrap();
    drop(conn);

    let err = repo.batch_update_emails().unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));

    // Ahmed's row was updated first inside the batch and must be undone.
    assert_eq!(
        stored_mails(&path),
        vec![Some("ahmed.ali@email.com".to_string()), None]
    );

    // The handle is back in auto-commit mode: a plain insert is durable
    // and visible to other connections right away.
    repo.insert(&Contact::new("Mona Adel")).unwrap();
    assert_eq!(stored_mails(&path).len(), 3);
}

#[test]
fn batch_update_fails_when_store_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("missing/contacts.db").display());
    let descriptor = ConnectionDescriptor::new("sqlite", url, "", "").unwrap();
    let mut repo = SqliteContactRepository::with_descriptor(descriptor);

    let err = repo.batch_update_emails().unwrap_err();
    assert!(err.is_connect());
}
