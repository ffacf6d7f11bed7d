//! Account and API-key command handlers: auth/deauth for the model key,
//! register/login/logout/whoami for local accounts. Registration and login
//! both finish with the demo one-time-code step; the code is printed to the
//! terminal because there is no real delivery channel.

use std::error::Error;
use std::io::{self, Write};

use crate::auth::otp::{validate_code_format, OtpVerifier, OTP_TTL_SECONDS};
use crate::auth::{AuthError, CredentialStore, User};
use crate::core::secrets;
use crate::storage::FileStore;

const OTP_ATTEMPTS: usize = 3;

pub fn run_auth() -> Result<(), Box<dyn Error>> {
    println!("🔐 Kilnchat API Key Setup");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    let token = prompt_line("Enter your API key: ")?;
    if token.is_empty() {
        return Err("No API key entered".into());
    }
    secrets::store_api_key(&token)?;
    println!("✅ API key stored in the system keyring");
    Ok(())
}

pub fn run_deauth() -> Result<(), Box<dyn Error>> {
    secrets::clear_api_key()?;
    println!("✅ Removed the stored API key");
    Ok(())
}

pub fn run_register() -> Result<(), Box<dyn Error>> {
    let accounts = open_accounts()?;

    println!("📝 Create a kilnchat account");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    let full_name = prompt_line("Full name: ")?;
    let email = prompt_line("Email: ")?;
    let mobile = prompt_line("Mobile: ")?;
    let password = prompt_line("Password: ")?;
    let confirmed = prompt_line("Confirm password: ")?;

    if full_name.is_empty() || email.is_empty() || mobile.is_empty() || password.is_empty() {
        return Err("All fields are required".into());
    }
    if password != confirmed {
        return Err("Passwords do not match".into());
    }

    verify_mobile(&mobile)?;

    let user = match accounts.register(&full_name, &email, &mobile, &password) {
        Ok(user) => user,
        Err(err @ AuthError::DuplicateUser { .. }) => {
            eprintln!("❌ {err}");
            eprintln!("💡 Use 'kilnchat login' if this is your account.");
            return Ok(());
        }
        Err(err) => return Err(Box::new(err)),
    };
    accounts.set_current(&user)?;
    println!("✅ Welcome, {}! You are signed in.", user.full_name);
    Ok(())
}

pub fn run_login() -> Result<(), Box<dyn Error>> {
    let accounts = open_accounts()?;

    println!("🔑 Sign in to kilnchat");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    let identifier = prompt_line("Email or mobile: ")?;
    let password = prompt_line("Password: ")?;

    let user = match accounts.login(&identifier, &password) {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            eprintln!("❌ Invalid credentials");
            return Ok(());
        }
        Err(err) => return Err(Box::new(err)),
    };

    verify_mobile(&user.mobile)?;

    accounts.set_current(&user)?;
    println!("✅ Welcome back, {}!", user.full_name);
    Ok(())
}

pub fn run_logout() -> Result<(), Box<dyn Error>> {
    let accounts = open_accounts()?;
    accounts.logout()?;
    println!("✅ Logged out");
    Ok(())
}

pub fn run_whoami() -> Result<(), Box<dyn Error>> {
    let accounts = open_accounts()?;
    match accounts.current_user() {
        Some(user) => {
            println!("{} <{}>", user.full_name, user.email);
            println!(
                "Registered {}",
                user.registration_date.format("%Y-%m-%d %H:%M UTC")
            );
        }
        None => println!("Not signed in (guest mode)"),
    }
    Ok(())
}

fn open_accounts() -> Result<CredentialStore<FileStore>, Box<dyn Error>> {
    Ok(CredentialStore::new(FileStore::open_default()?))
}

/// Run the one-time-code exchange for a mobile number, allowing resends and
/// a bounded number of wrong guesses.
fn verify_mobile(mobile: &str) -> Result<(), Box<dyn Error>> {
    let mut verifier = OtpVerifier::new();
    let mut delivery = verifier.send(mobile)?;
    println!();
    println!(
        "🔐 One-time code for {}: {} (valid for {}s)",
        delivery.mobile, delivery.code, OTP_TTL_SECONDS
    );

    let mut attempts = 0;
    while attempts < OTP_ATTEMPTS {
        let input = prompt_line("Enter the 6-digit code (or 'resend'): ")?;
        if input.eq_ignore_ascii_case("resend") {
            delivery = verifier.send(mobile)?;
            println!(
                "🔐 One-time code for {}: {} (valid for {}s)",
                delivery.mobile, delivery.code, OTP_TTL_SECONDS
            );
            continue;
        }
        if let Err(err) = validate_code_format(&input) {
            eprintln!("⚠️  {err}");
            continue;
        }
        if verifier.verify(mobile, &input) {
            return Ok(());
        }
        attempts += 1;
        eprintln!("❌ Wrong or expired code");
    }
    Err("Verification failed".into())
}

fn prompt_line(label: &str) -> Result<String, Box<dyn Error>> {
    print!("{label}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Short display line for a signed-in user, shared with the chat greeting.
pub fn signed_in_line(user: &User) -> String {
    format!("Signed in as {} <{}>", user.full_name, user.email)
}
