//! Adds one teacher interactively.
//!
//! Prompts for each profile field on standard input, validates the answers
//! and inserts the teacher unless one with the same email already exists.
//!
//! Run with:
//! ```
//! STORE_URL=... PUBLIC_KEY=... cargo run -p seed-data --bin add-teacher
//! ```

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use seed_data::prelude::*;
use tutoring::TeacherProfile;

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_logging();

    match run().await {
        Ok(code) => code,
        Err(e) => cli::fail(&e),
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    // Configuration is checked before asking anything
    let store = cli::connect(CredentialTier::Public)?;

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    println!("إضافة معلم جديد / Add a new teacher");
    let input = TeacherInput::prompt(&mut prompter).context("reading teacher details")?;
    let profile = input.into_profile()?;

    println!();
    println!("  {} <{}>", profile.name, profile.email);
    println!("  {} | {}", profile.subjects.join("، "), profile.city);
    println!(
        "  {} / hour, {} years, {}",
        profile.hourly_rate,
        profile.experience_years,
        profile.teaching_mode.as_str()
    );
    if !prompter.confirm("حفظ؟ Save?").context("reading confirmation")? {
        println!("Cancelled, nothing saved");
        return Ok(ExitCode::SUCCESS);
    }

    let batch = SeedBatch::from_items(
        TeacherProfile::TABLE,
        TeacherProfile::EXISTENCE_KEY,
        std::slice::from_ref(&profile),
    )?;
    let result = load(&store, &batch, LoadStrategy::DirectInsert).await;

    Ok(cli::finish_load("teacher", result))
}
