//! Demo driver for the contact persistence core.
//!
//! # Responsibility
//! - Exercise table creation, insert, list, search and the mail batch update
//!   against a real database.
//! - Print advisory progress messages only.
//!
//! Usage: `contacts_cli [PROPERTIES_FILE]`. Without a file the demo uses
//! `contacts.db` in the working directory.

use contacts_core::{
    default_log_level, init_logging, Contact, ContactRepository, ConnectionDescriptor,
    SqliteContactRepository,
};
use log::error;
use std::process::ExitCode;

const DEFAULT_URL: &str = "sqlite:contacts.db";

fn main() -> ExitCode {
    if let Err(err) = init_logging(default_log_level(), None) {
        eprintln!("logging disabled: {err}");
    }

    println!("=== contacts_core {} demo ===", contacts_core::core_version());

    let mut repo = match build_repository(std::env::args().nth(1)) {
        Ok(repo) => repo,
        Err(err) => {
            error!("event=cli_start module=cli status=error error={err}");
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = run_demo(&mut repo);

    match repo.close() {
        Ok(()) => println!("\nConnection closed."),
        Err(err) => eprintln!("\nError closing connection: {err}"),
    }
    outcome
}

fn build_repository(
    properties_path: Option<String>,
) -> Result<SqliteContactRepository, Box<dyn std::error::Error>> {
    match properties_path {
        Some(path) => {
            println!("1. Loading connection settings from {path}...");
            Ok(SqliteContactRepository::from_properties_file(path)?)
        }
        None => {
            println!("1. Using default database {DEFAULT_URL}...");
            let descriptor = ConnectionDescriptor::new("sqlite", DEFAULT_URL, "", "")?;
            Ok(SqliteContactRepository::with_descriptor(descriptor))
        }
    }
}

fn run_demo(repo: &mut SqliteContactRepository) -> ExitCode {
    println!("\n2. Creating contacts table...");
    match repo.create_table() {
        Ok(()) => println!("+ Table ready."),
        Err(err) => println!("x Failed to create table: {err}"),
    }

    println!("\n3. Inserting sample contacts...");
    for (label, contact) in sample_contacts().iter().enumerate() {
        match repo.insert(contact) {
            Ok(id) => println!("Contact {} inserted with id {id}", label + 1),
            Err(err) => println!("Contact {} not inserted: {err}", label + 1),
        }
    }

    println!("\n4. Retrieving all contacts...");
    print_contacts(repo.list_all());

    println!("\n5. Searching contacts with name containing 'Ahmed'...");
    print_contacts(repo.search_by_name("Ahmed"));

    println!("\n6. Deriving institutional mail addresses...");
    match repo.batch_update_emails() {
        Ok(updated) => println!("+ {updated} mail addresses updated."),
        Err(err) => {
            eprintln!("x Mail update rolled back: {err}");
            return ExitCode::FAILURE;
        }
    }
    print_contacts(repo.list_all());

    println!("\n=== Demo completed ===");
    ExitCode::SUCCESS
}

fn sample_contacts() -> [Contact; 2] {
    let mut ahmed = Contact::new("Ahmed Ali");
    ahmed.nickname = Some("Ahmed".to_string());
    ahmed.address = Some("123 Cairo Street, Egypt".to_string());
    ahmed.home_phone = Some("02-1234567".to_string());
    ahmed.work_phone = Some("02-7654321".to_string());
    ahmed.cellphone = Some("010-12345678".to_string());
    ahmed.mail = Some("ahmed.ali@email.com".to_string());
    ahmed.website = Some("www.ahmed-ali.com".to_string());
    ahmed.profession = Some("Software Engineer".to_string());

    let mut fatima = Contact::new("Fatima Hassan");
    fatima.nickname = Some("Fatima".to_string());
    fatima.address = Some("456 Alexandria Avenue, Egypt".to_string());
    fatima.home_phone = Some("03-9876543".to_string());
    fatima.cellphone = Some("011-87654321".to_string());
    fatima.mail = Some("fatima.hassan@email.com".to_string());
    fatima.profession = Some("Doctor".to_string());

    [ahmed, fatima]
}

fn print_contacts(result: contacts_core::RepoResult<Vec<Contact>>) {
    match result {
        Ok(contacts) => {
            println!("Found {} contacts:", contacts.len());
            for contact in contacts {
                println!(
                    "- ID: {}, Name: {}, Email: {}, Profession: {}",
                    contact.id.unwrap_or_default(),
                    contact.name,
                    contact.mail.as_deref().unwrap_or("-"),
                    contact.profession.as_deref().unwrap_or("-")
                );
            }
        }
        Err(err) if err.is_connect() => println!("x Database unreachable: {err}"),
        Err(err) => println!("x Query failed: {err}"),
    }
}
