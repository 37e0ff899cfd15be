use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    process::exit,
    time::SystemTime,
};

use clap::{arg, value_parser, ArgMatches, Command};
use rotp::{
    codec::{is_well_formed_base32, normalize_base32},
    generate_key, qr, totp, Algorithm, Digits, GenerateOptions, OtpConfig, OtpError,
};
use tracing_subscriber::{prelude::*, EnvFilter};

const SUBCOMMAND_ENROLL: &str = "enroll";
const SUBCOMMAND_CODE: &str = "code";
const SUBCOMMAND_CHECK: &str = "check";

const PNG_FILE: &str = "code.png";
const SECRET_FILE: &str = "secret.txt";

fn get_cli_args() -> Command {
    Command::new("rotp")
        .about("TOTP enrollment and validation")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            arg!(--dir <DIR> "Directory holding the QR code and the secret")
                .default_value("./qrcode")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            arg!(--period <SECONDS> "Seconds per time-step")
                .default_value("30")
                .value_parser(value_parser!(u64))
                .global(true),
        )
        .arg(
            arg!(--digits <DIGITS> "Passcode length (6 or 8)")
                .default_value("6")
                .global(true),
        )
        .arg(
            arg!(--algorithm <ALGORITHM> "SHA1, SHA256, SHA512 or MD5")
                .default_value("SHA1")
                .global(true),
        )
        .subcommand(
            Command::new(SUBCOMMAND_ENROLL)
                .about("Create a key, its QR code and its secret file")
                .arg(arg!(--issuer <ISSUER> "Issuer").default_value("rotp.test"))
                .arg(arg!(--account <ACCOUNT> "Account name").default_value("example@rotp.test"))
                .arg(
                    arg!(--size <PIXELS> "QR code width and height")
                        .default_value("200")
                        .value_parser(value_parser!(u32)),
                ),
        )
        .subcommand(Command::new(SUBCOMMAND_CODE).about("Print the current passcode"))
        .subcommand(
            Command::new(SUBCOMMAND_CHECK)
                .about("Validate a passcode read from stdin")
                .arg(
                    arg!(--window <STEPS> "Time-steps tolerated on each side")
                        .default_value("1")
                        .value_parser(value_parser!(u64)),
                ),
        )
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "rotp=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn build_config(args: &ArgMatches) -> Result<OtpConfig, OtpError> {
    let period = args.get_one::<u64>("period").copied().unwrap_or_default();
    let digits: Digits = match args.get_one::<String>("digits") {
        Some(d) => d.parse()?,
        None => Default::default(),
    };
    let algorithm: Algorithm = match args.get_one::<String>("algorithm") {
        Some(a) => a.parse()?,
        None => Default::default(),
    };
    Ok(OtpConfig::default()
        .with_period(period)
        .with_digits(digits)
        .with_algorithm(algorithm))
}

fn read_secret(dir: &Path) -> Option<String> {
    let path = dir.join(SECRET_FILE);
    let secret = match fs::read_to_string(&path) {
        Ok(s) => s.trim().to_string(),
        Err(e) => {
            eprintln!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };

    if !is_well_formed_base32(&normalize_base32(&secret)) {
        eprintln!("Invalid secret format, should be a valid base32 string");
        return None;
    }
    Some(secret)
}

fn handle_enroll_cmd(dir: &Path, config: &OtpConfig, cmd_args: &ArgMatches) -> bool {
    let issuer = cmd_args.get_one::<String>("issuer").cloned().unwrap_or_default();
    let account = cmd_args.get_one::<String>("account").cloned().unwrap_or_default();
    let size = cmd_args.get_one::<u32>("size").copied().unwrap_or(200);

    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!("Failed to create {}: {}", dir.display(), e);
        return false;
    }

    let opts = GenerateOptions {
        period: config.period,
        digits: config.digits,
        algorithm: config.algorithm,
        ..GenerateOptions::new(issuer, account)
    };
    let key = match generate_key(opts) {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Failed to generate the key: {}", e);
            return false;
        }
    };

    let png = match key.qr_image(size, size).and_then(|img| qr::encode_png(&img)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to render the QR code: {}", e);
            return false;
        }
    };

    println!("{:<14}{}", "Issuer:", key.issuer());
    println!("{:<14}{}", "Account Name:", key.account_name());
    println!("{:<14}{}", "Secret:", key.secret());

    let png_path = dir.join(PNG_FILE);
    let secret_path = dir.join(SECRET_FILE);
    tracing::info!(path = %png_path.display(), "writing QR code");
    if let Err(e) = fs::write(&png_path, png) {
        eprintln!("Failed to write {}: {}", png_path.display(), e);
        return false;
    }
    tracing::info!(path = %secret_path.display(), "writing secret");
    if let Err(e) = fs::write(&secret_path, key.secret()) {
        eprintln!("Failed to write {}: {}", secret_path.display(), e);
        return false;
    }

    println!("Add the key to your OTP application, then run `rotp check`");
    true
}

fn handle_code_cmd(dir: &Path, config: &OtpConfig) -> bool {
    let Some(secret) = read_secret(dir) else {
        return false;
    };
    match totp::current_code(&secret, config) {
        Ok(code) => {
            println!("{}", code);
            true
        }
        Err(e) => {
            eprintln!("Code generation error: {}", e);
            false
        }
    }
}

fn handle_check_cmd(dir: &Path, config: &OtpConfig, cmd_args: &ArgMatches) -> bool {
    let window = cmd_args.get_one::<u64>("window").copied().unwrap_or(1);
    let config = config.with_window(window);
    let Some(secret) = read_secret(dir) else {
        return false;
    };

    print!("Enter Passcode: ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut passcode = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut passcode) {
        eprintln!("Failed to read the passcode: {}", e);
        return false;
    }

    match totp::validate_code(&passcode, &secret, SystemTime::now(), &config) {
        Ok(true) => {
            println!("Valid passcode!");
            true
        }
        Ok(false) => {
            println!("Failed to validate passcode...");
            false
        }
        Err(e) => {
            println!("Failed to validate passcode: {}", e);
            false
        }
    }
}

fn main() {
    init_tracing();

    let args = get_cli_args().get_matches();
    let Some((name, cmd_args)) = args.subcommand() else {
        unreachable!()
    };

    let config = match build_config(cmd_args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            exit(2);
        }
    };
    let dir = cmd_args
        .get_one::<PathBuf>("dir")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("./qrcode"));

    let res = match name {
        SUBCOMMAND_ENROLL => handle_enroll_cmd(&dir, &config, cmd_args),
        SUBCOMMAND_CODE => handle_code_cmd(&dir, &config),
        SUBCOMMAND_CHECK => handle_check_cmd(&dir, &config, cmd_args),
        _ => unreachable!(),
    };

    if !res {
        exit(1);
    }
}
