//! fortipage - Main application entry point

use fortipage::cli::{CliApp, exit_codes};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        // Only warn if it's not a "file not found" error
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let code = match CliApp::new().run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fortipage: {e:#}");
            exit_codes::INTERNAL_ERROR
        }
    };
    std::process::exit(code);
}
