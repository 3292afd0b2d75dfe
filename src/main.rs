use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use perspective::config::Config;
use perspective::images::{self, Mode};
use perspective::maintenance::{self, Added, Updater};
use perspective::reminder::Reminder;
use perspective::store::Store;
use perspective::{mail, server};
use serde_json::Value;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process;

/// Success, or a blog that is up to date.
const EXIT_OK: i32 = 0;

/// A failed operation, or a reminder that is due.
const EXIT_FAILURE: i32 = 1;

/// The configuration or store couldn't be read.
const EXIT_SETUP: i32 = 2;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    process::exit(run(&app().get_matches()));
}

fn app() -> App<'static, 'static> {
    App::new("perspective")
        .about("A small personal blog with article, reminder and header image utilities")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .long("config")
                .short("c")
                .takes_value(true)
                .value_name("FILE")
                .global(true)
                .help("Project file to use instead of searching for blog.yaml"),
        )
        .subcommand(SubCommand::with_name("serve").about("Serves the blog over HTTP"))
        .subcommand(
            SubCommand::with_name("article")
                .about("Lists, adds and updates articles")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(SubCommand::with_name("list").about("Lists all articles"))
                .subcommand(SubCommand::with_name("sample").about("Prints a sample article"))
                .subcommand(
                    SubCommand::with_name("add")
                        .about("Adds an article from a JSON file")
                        .arg(Arg::with_name("file").required(true)),
                )
                .subcommand(
                    SubCommand::with_name("update")
                        .about("Merges fields from a JSON file into an article")
                        .arg(Arg::with_name("id").required(true))
                        .arg(Arg::with_name("file").required(true)),
                ),
        )
        .subcommand(
            SubCommand::with_name("reminder")
                .about("Checks whether a new article is due")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("check")
                        .about("Exits with status 1 when a new article is due"),
                )
                .subcommand(SubCommand::with_name("remind").about("Prints the reminder report"))
                .subcommand(
                    SubCommand::with_name("log").about("Appends the report to the reminder log"),
                )
                .subcommand(SubCommand::with_name("stats").about("Prints blog statistics"))
                .subcommand(
                    SubCommand::with_name("email")
                        .about("Emails the reminder report")
                        .arg(Arg::with_name("to").required(true)),
                ),
        )
        .subcommand(
            SubCommand::with_name("images")
                .about("Generates a header image for every article")
                .arg(
                    Arg::with_name("simple")
                        .long("simple")
                        .help("Draws a flat colour with the title instead of generative art"),
                ),
        )
}

fn run(matches: &ArgMatches) -> i32 {
    let config = match load_config(matches.value_of("config")) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading configuration: {}", err);
            return EXIT_SETUP;
        }
    };

    match matches.subcommand() {
        ("serve", Some(_)) => match server::serve(&config) {
            Ok(()) => EXIT_OK,
            Err(err) => {
                log::error!("{}", err);
                EXIT_SETUP
            }
        },
        ("article", Some(matches)) => article(&config, matches),
        ("reminder", Some(matches)) => reminder(&config, matches),
        ("images", Some(matches)) => {
            let mode = match matches.is_present("simple") {
                true => Mode::Simple,
                false => Mode::Artistic,
            };
            match images::generate_all(&config, mode) {
                Ok(written) => {
                    for path in &written {
                        println!("Created {}", path.display());
                    }
                    println!("Generated {} images", written.len());
                    EXIT_OK
                }
                Err(err) => {
                    eprintln!("Error generating images: {}", err);
                    EXIT_FAILURE
                }
            }
        }
        _ => EXIT_FAILURE,
    }
}

fn load_config(path: Option<&str>) -> Result<Config, Box<dyn Error>> {
    Ok(match path {
        Some(path) => Config::from_project_file(Path::new(path))?,
        None => Config::from_directory(&std::env::current_dir()?)?,
    })
}

fn read_json(path: &str) -> Result<Value, Box<dyn Error>> {
    let file = File::open(path).map_err(|err| format!("opening `{}`: {}", path, err))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn string_field(fragment: &Value, key: &str) -> String {
    fragment
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn article(config: &Config, matches: &ArgMatches) -> i32 {
    let store = Store::new(&config.store_path);
    let updater = Updater::new(&store);

    match matches.subcommand() {
        ("list", Some(_)) => match updater.list(&mut std::io::stdout()) {
            Ok(()) => EXIT_OK,
            Err(err) => {
                eprintln!("Error listing articles: {}", err);
                EXIT_SETUP
            }
        },
        ("sample", Some(_)) => {
            let sample = maintenance::sample(chrono::Local::now().date_naive());
            println!("\nSample Article Format:");
            match serde_json::to_string_pretty(&sample) {
                Ok(json) => println!("{}", json),
                Err(err) => {
                    eprintln!("Error printing sample: {}", err);
                    return EXIT_FAILURE;
                }
            }
            println!("\nSave this to a JSON file and use 'article add' to add it to the blog.");
            EXIT_OK
        }
        ("add", Some(matches)) => {
            let file = matches.value_of("file").unwrap_or_default();
            let result = read_json(file).and_then(|fragment| {
                let id = string_field(&fragment, "id");
                let title = string_field(&fragment, "title");
                Ok((updater.add(fragment)?, id, title))
            });
            match result {
                Ok((Added::Inserted, _, title)) => {
                    println!("Added article: {}", title);
                    EXIT_OK
                }
                Ok((Added::Duplicate, id, _)) => {
                    println!("Article with ID '{}' already exists. Skipping.", id);
                    EXIT_OK
                }
                Err(err) => {
                    eprintln!("Error adding article: {}", err);
                    EXIT_FAILURE
                }
            }
        }
        ("update", Some(matches)) => {
            let id = matches.value_of("id").unwrap_or_default();
            let file = matches.value_of("file").unwrap_or_default();
            let result = read_json(file).and_then(|fragment| match fragment {
                Value::Object(updates) => Ok(updater.update(id, updates)?),
                _ => Err(maintenance::Error::NotAnObject.into()),
            });
            match result {
                Ok(true) => {
                    println!("Article updated successfully");
                    EXIT_OK
                }
                Ok(false) => {
                    println!("Article with ID '{}' not found", id);
                    EXIT_FAILURE
                }
                Err(err) => {
                    eprintln!("Error updating article: {}", err);
                    EXIT_FAILURE
                }
            }
        }
        _ => EXIT_FAILURE,
    }
}

fn reminder(config: &Config, matches: &ArgMatches) -> i32 {
    let articles = match Store::new(&config.store_path).load() {
        Ok(articles) => articles,
        Err(err) => {
            eprintln!("Error loading articles: {}", err);
            return EXIT_SETUP;
        }
    };
    let now = chrono::Local::now().naive_local();
    let reminder = Reminder::new(&articles, now);

    match matches.subcommand() {
        ("check", Some(_)) => match reminder.should_remind() {
            true => {
                println!("Time for a new article!");
                println!("Days since last article: {}", reminder.days_since_last());
                EXIT_FAILURE
            }
            false => {
                println!("Blog is up to date");
                EXIT_OK
            }
        },
        ("remind", Some(_)) => {
            println!("{}", reminder.report());
            EXIT_OK
        }
        ("log", Some(_)) => match reminder.log_report(&config.reminder_log) {
            Ok(()) => {
                println!("Reminder logged to {}", config.reminder_log.display());
                EXIT_OK
            }
            Err(err) => {
                eprintln!(
                    "Failed to log reminder to {}: {}",
                    config.reminder_log.display(),
                    err
                );
                EXIT_FAILURE
            }
        },
        ("stats", Some(_)) => {
            print!("{}", reminder.stats());
            EXIT_OK
        }
        ("email", Some(matches)) => {
            let to = matches.value_of("to").unwrap_or_default();
            let smtp = match &config.smtp {
                Some(smtp) => smtp,
                None => {
                    eprintln!("Failed to send email: no smtp section in the project file");
                    return EXIT_FAILURE;
                }
            };
            let subject = format!("Weekly Blog Reminder - {}", now.format("%B %d, %Y"));
            match mail::send_report(smtp, to, &subject, reminder.report()) {
                true => {
                    println!("Reminder sent to {}", to);
                    EXIT_OK
                }
                false => {
                    eprintln!("Failed to send email to {}", to);
                    EXIT_FAILURE
                }
            }
        }
        _ => EXIT_FAILURE,
    }
}
