//! Back office CLI - database migrations and tenant management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bo-cli migrate
//!
//! # Create a tenant (prints the minted company code)
//! bo-cli company create -n "Acme Apparel" -e orders@acme.test
//!
//! # Create an admin for a tenant
//! BO_PASSWORD=... bo-cli admin create -c CMP0001 -e admin@acme.test -n "Ada Admin" -r super_admin
//!
//! # Create a customer for a tenant
//! BO_PASSWORD=... bo-cli customer create -c CMP0001 -e jo@example.com -f Jo -l Smith
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `company create` - Create a tenant
//! - `admin create` - Create admin users
//! - `customer create` - Create customers

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bo-cli")]
#[command(author, version, about = "Back office CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage tenants
    Company {
        #[command(subcommand)]
        action: CompanyAction,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage customers
    Customer {
        #[command(subcommand)]
        action: CustomerAction,
    },
}

#[derive(Subcommand)]
enum CompanyAction {
    /// Create a new tenant
    Create {
        /// Company name
        #[arg(short, long)]
        name: String,

        /// Contact email printed on invoices
        #[arg(short, long)]
        email: Option<String>,

        /// Contact phone
        #[arg(short, long)]
        phone: Option<String>,

        /// Postal address printed on invoices
        #[arg(short, long)]
        address: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Tenant the admin belongs to (e.g. `CMP0001`)
        #[arg(short, long)]
        company: String,

        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin role (`super_admin`, `admin`, `viewer`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Initial password
        #[arg(long, env = "BO_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum CustomerAction {
    /// Create a new customer
    Create {
        /// Tenant the customer belongs to (e.g. `CMP0001`)
        #[arg(short, long)]
        company: String,

        /// Customer email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,

        /// Phone number
        #[arg(short, long)]
        phone: Option<String>,

        /// Initial password
        #[arg(long, env = "BO_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Company { action } => match action {
            CompanyAction::Create {
                name,
                email,
                phone,
                address,
            } => {
                commands::company::create(
                    &name,
                    email.as_deref(),
                    phone.as_deref(),
                    address.as_deref(),
                )
                .await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                company,
                email,
                name,
                role,
                password,
            } => {
                commands::admin::create_user(&company, &email, &name, &role, &password).await?;
            }
        },
        Commands::Customer { action } => match action {
            CustomerAction::Create {
                company,
                email,
                first_name,
                last_name,
                phone,
                password,
            } => {
                commands::customer::create(
                    &company,
                    backoffice_admin::models::RegisterCustomerInput {
                        email,
                        password,
                        first_name,
                        last_name,
                        phone,
                    },
                )
                .await?;
            }
        },
    }
    Ok(())
}
