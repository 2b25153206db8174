use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::fs;

#[derive(Parser)]
#[command(name = "slotbook-cli")]
#[command(about = "CLI for the slotbook booking API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "http://localhost:5001")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, default_value = "")]
        tel: String,
        #[arg(short, long)]
        password: String,
    },
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Me,
    Companies,
    CreateCompany {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        position: String,
        #[arg(short, long)]
        jd: String,
        #[arg(short, long)]
        location: String,
        #[arg(short, long, default_value = "")]
        tel: String,
        #[arg(short, long, default_value = "")]
        image: String,
    },
    DeleteCompany {
        #[arg(short, long)]
        id: String,
    },
    /// Book an interview slot against a company
    Book {
        #[arg(short, long)]
        company: String,
        /// RFC 3339 date, e.g. 2026-09-01T10:00:00Z
        #[arg(short, long)]
        date: String,
    },
    Bookings,
    GetBooking {
        #[arg(short, long)]
        id: String,
    },
    /// Move a booking to a new date
    Reschedule {
        #[arg(short, long)]
        id: String,
        #[arg(short, long)]
        date: String,
    },
    Cancel {
        #[arg(short, long)]
        id: String,
    },
    Logout,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

const TOKEN_FILE: &str = ".slotbook_token";

fn saved_token() -> String {
    fs::read_to_string(TOKEN_FILE).unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Register { name, email, tel, password } => {
            let res = client.post(format!("{}/api/v1/auth/register", cli.url))
                .json(&json!({ "name": name, "email": email, "tel": tel, "password": password }))
                .send()
                .await?;
            if res.status().is_success() {
                let body: LoginResponse = res.json().await?;
                fs::write(TOKEN_FILE, body.token)?;
                println!("Registered. Token saved to {TOKEN_FILE}");
            } else {
                println!("Register failed: {}", res.text().await?);
            }
        }
        Commands::Login { email, password } => {
            let res = client.post(format!("{}/api/v1/auth/login", cli.url))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;
            if res.status().is_success() {
                let body: LoginResponse = res.json().await?;
                fs::write(TOKEN_FILE, body.token)?;
                println!("Logged in. Token saved to {TOKEN_FILE}");
            } else {
                println!("Login failed: {}", res.text().await?);
            }
        }
        Commands::Me => {
            let res = client.get(format!("{}/api/v1/auth/me", cli.url))
                .header("Authorization", format!("Bearer {}", saved_token()))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::Companies => {
            let res = client.get(format!("{}/api/v1/companies", cli.url))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::CreateCompany { name, position, jd, location, tel, image } => {
            let res = client.post(format!("{}/api/v1/companies", cli.url))
                .header("Authorization", format!("Bearer {}", saved_token()))
                .json(&json!({
                    "name": name,
                    "position": position,
                    "jd": jd,
                    "location": location,
                    "tel": tel,
                    "image": image
                }))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::DeleteCompany { id } => {
            let res = client.delete(format!("{}/api/v1/companies/{}", cli.url, id))
                .header("Authorization", format!("Bearer {}", saved_token()))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::Book { company, date } => {
            let res = client.post(format!("{}/api/v1/companies/{}/bookings", cli.url, company))
                .header("Authorization", format!("Bearer {}", saved_token()))
                .json(&json!({ "bookingDate": date }))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::Bookings => {
            let res = client.get(format!("{}/api/v1/bookings", cli.url))
                .header("Authorization", format!("Bearer {}", saved_token()))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::GetBooking { id } => {
            let res = client.get(format!("{}/api/v1/bookings/{}", cli.url, id))
                .header("Authorization", format!("Bearer {}", saved_token()))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::Reschedule { id, date } => {
            let res = client.put(format!("{}/api/v1/bookings/{}", cli.url, id))
                .header("Authorization", format!("Bearer {}", saved_token()))
                .json(&json!({ "bookingDate": date }))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::Cancel { id } => {
            let res = client.delete(format!("{}/api/v1/bookings/{}", cli.url, id))
                .header("Authorization", format!("Bearer {}", saved_token()))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::Logout => {
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
        }
    }

    Ok(())
}
