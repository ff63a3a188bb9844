use std::path::PathBuf;

use dialoguer::Confirm;
use profile_store::{Profile, ProfileStore, SledStore};
use structopt::StructOpt;
use tokio::runtime::Runtime;

/// Offline administration for the profile database. Opens the database
/// directly, so the server must not be running against the same path.
#[derive(Debug, StructOpt)]
#[structopt(name = "profile-cli", about = "Administer a profile database")]
struct Opt {
    /// Path of the profile database
    #[structopt(parse(from_os_str))]
    db_path: PathBuf,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// List every profile
    List,
    /// Show one profile
    Show { email: String },
    /// Create a profile or overwrite an existing one
    Set {
        email: String,
        #[structopt(long)]
        name: Option<String>,
        #[structopt(long)]
        address: Option<String>,
    },
    /// Remove one profile
    Remove { email: String },
    /// Remove every profile
    Purge {
        /// Skip the confirmation prompt
        #[structopt(long)]
        yes: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();

    let runtime = Runtime::new()?;
    let store = SledStore::open(&opt.db_path)?;

    match opt.command {
        Command::List => {
            let profiles = runtime.block_on(store.list_all())?;
            if profiles.is_empty() {
                println!("no profiles");
            }
            for profile in profiles {
                print_row(&profile);
            }
        }
        Command::Show { email } => {
            let profile = runtime.block_on(store.get(&email))?;
            println!("email:   {}", profile.email);
            println!("name:    {}", profile.name.unwrap_or_default());
            println!("address: {}", profile.address.unwrap_or_default());
        }
        Command::Set {
            email,
            name,
            address,
        } => {
            let (profile, was_created) = runtime.block_on(store.upsert(&email, name, address))?;
            let verb = if was_created { "created" } else { "updated" };
            println!("{} {}", verb, profile.email);
        }
        Command::Remove { email } => {
            runtime.block_on(store.delete(&email))?;
            println!("removed {email}");
        }
        Command::Purge { yes } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt("Remove every profile?")
                    .default(false)
                    .interact()?;
            if confirmed {
                let deleted = runtime.block_on(store.delete_all())?;
                println!("removed {deleted} profiles");
            } else {
                println!("aborted");
            }
        }
    }

    runtime.block_on(store.close())?;

    Ok(())
}

fn print_row(profile: &Profile) {
    println!(
        "{}\t{}\t{}",
        profile.email,
        profile.name.as_deref().unwrap_or("-"),
        profile.address.as_deref().unwrap_or("-")
    );
}
