//! Cryptainer CLI — operator surface for the cryptainer engine
//! (component K, SPEC_FULL.md §6.B).
//!
//! Usage:
//!   cryptainer encrypt --cryptoconf <FILE> --in <FILE> --out <FILE> [--keystore-dir <DIR>] [--no-offload] [--metadata-json <JSON>]
//!   cryptainer decrypt --in <FILE> --out <FILE> [--keystore-dir <DIR>] [--passphrase <VALUE>]... [--no-verify]
//!   cryptainer inspect --in <FILE>

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use cryptainer_core::{io, validator, CryptainerDecryptor, CryptainerEncryptor, Cryptoconf, PassphraseMapper, TrusteeRegistry};
use cryptainer_keystore::{FileBackend, Keystore, KeystorePool};

fn usage() -> ! {
    eprintln!(
        "Cryptainer — recursive-layer encryption engine\n\
         \n\
         Commands:\n\
         \n\
         Encrypt a file:\n\
         \n\
         cryptainer encrypt --cryptoconf <FILE> --in <FILE> --out <FILE> [--keystore-dir <DIR>] [--no-offload] [--metadata-json <JSON>]\n\
         \n\
         Decrypt a file:\n\
         \n\
         cryptainer decrypt --in <FILE> --out <FILE> [--keystore-dir <DIR>] [--passphrase <VALUE>]... [--no-verify]\n\
         \n\
         Inspect a cryptainer's header without decrypting it:\n\
         \n\
         cryptainer inspect --in <FILE>\n"
    );
    process::exit(1);
}

fn die(msg: &str) -> ! {
    eprintln!("error: {}", msg);
    process::exit(1);
}

/// Manual `--flag value` scanner — no argument-parsing crate.
/// Repeatable flags (`--passphrase`) simply appear more than once in the vec;
/// bare switches (`--no-offload`, `--no-verify`) are recorded with value `""`.
fn parse_args() -> (String, Vec<(String, String)>) {
    const SWITCHES: &[&str] = &["--no-offload", "--no-verify"];

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let command = args[1].clone();
    let mut flags: Vec<(String, String)> = Vec::new();

    let mut i = 2;
    while i < args.len() {
        if !args[i].starts_with("--") {
            die(&format!("unexpected argument: {}", args[i]));
        }
        if SWITCHES.contains(&args[i].as_str()) {
            flags.push((args[i].clone(), String::new()));
            i += 1;
        } else if i + 1 < args.len() {
            flags.push((args[i].clone(), args[i + 1].clone()));
            i += 2;
        } else {
            die(&format!("missing value for flag: {}", args[i]));
        }
    }

    (command, flags)
}

fn get_flag(flags: &[(String, String)], name: &str) -> Option<String> {
    flags.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
}

fn get_all_flags(flags: &[(String, String)], name: &str) -> Vec<String> {
    flags.iter().filter(|(k, _)| k == name).map(|(_, v)| v.clone()).collect()
}

fn has_flag(flags: &[(String, String)], name: &str) -> bool {
    flags.iter().any(|(k, _)| k == name)
}

fn require_flag(flags: &[(String, String)], name: &str) -> String {
    get_flag(flags, name).unwrap_or_else(|| die(&format!("missing required flag: {}", name)))
}

fn keystore_dir(flags: &[(String, String)]) -> PathBuf {
    get_flag(flags, "--keystore-dir")
        .or_else(|| std::env::var("CRYPTAINER_KEYSTORE_DIR").ok())
        .unwrap_or_else(|| "./cryptainer-keys".to_string())
        .into()
}

fn open_registry(dir: &std::path::Path) -> Arc<TrusteeRegistry> {
    let backend = FileBackend::new(dir)
        .unwrap_or_else(|e| die(&format!("open keystore dir {}: {}", dir.display(), e)));
    let local_factory = Arc::new(Keystore::new(Arc::new(backend)));
    let pool = Arc::new(KeystorePool::new(local_factory));
    Arc::new(TrusteeRegistry::new(pool))
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("CRYPTAINER_LOG")
        .unwrap_or_else(|_| "cryptainer_cli=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).without_time().init();
}

async fn cmd_encrypt(flags: &[(String, String)]) {
    let cryptoconf_path = require_flag(flags, "--cryptoconf");
    let in_path = require_flag(flags, "--in");
    let out_path = require_flag(flags, "--out");
    let offload = !has_flag(flags, "--no-offload");
    let metadata = get_flag(flags, "--metadata-json").map(|raw| {
        serde_json::from_str::<serde_json::Value>(&raw).unwrap_or_else(|e| die(&format!("invalid --metadata-json: {}", e)))
    });

    let cryptoconf_bytes =
        std::fs::read(&cryptoconf_path).unwrap_or_else(|e| die(&format!("read {}: {}", cryptoconf_path, e)));
    let cryptoconf: Cryptoconf =
        serde_json::from_slice(&cryptoconf_bytes).unwrap_or_else(|e| die(&format!("parse {}: {}", cryptoconf_path, e)));
    validator::check_cryptoconf_sanity(&cryptoconf).unwrap_or_else(|e| die(&format!("invalid cryptoconf: {}", e)));

    let plaintext = std::fs::read(&in_path).unwrap_or_else(|e| die(&format!("read {}: {}", in_path, e)));

    let registry = open_registry(&keystore_dir(flags));
    let cryptainer = CryptainerEncryptor::new(&registry)
        .encrypt(&cryptoconf, &plaintext, None, metadata)
        .await
        .unwrap_or_else(|e| die(&format!("encryption failed: {}", e)));

    io::dump(std::path::Path::new(&out_path), &cryptainer, offload)
        .unwrap_or_else(|e| die(&format!("write {}: {}", out_path, e)));

    eprintln!(
        "encrypted {} -> {} ({} bytes plaintext, {} layer(s){})",
        in_path,
        out_path,
        plaintext.len(),
        cryptainer.payload_cipher_layers.len(),
        if offload { ", payload offloaded" } else { "" }
    );
}

async fn cmd_decrypt(flags: &[(String, String)]) {
    let in_path = require_flag(flags, "--in");
    let out_path = require_flag(flags, "--out");
    let verify = !has_flag(flags, "--no-verify");
    let passphrases = get_all_flags(flags, "--passphrase");

    let cryptainer = io::load(std::path::Path::new(&in_path), true)
        .unwrap_or_else(|e| die(&format!("read {}: {}", in_path, e)));

    let mut passphrase_mapper = PassphraseMapper::new();
    if !passphrases.is_empty() {
        passphrase_mapper.set_passphrases(None, passphrases);
    }

    let registry = open_registry(&keystore_dir(flags));
    let plaintext = CryptainerDecryptor::new(&registry)
        .decrypt(&cryptainer, &passphrase_mapper, verify)
        .await
        .unwrap_or_else(|e| die(&format!("decryption failed: {}", e)));

    std::fs::write(&out_path, &plaintext).unwrap_or_else(|e| die(&format!("write {}: {}", out_path, e)));

    eprintln!("decrypted {} -> {} ({} bytes plaintext)", in_path, out_path, plaintext.len());
}

fn cmd_inspect(flags: &[(String, String)]) {
    let in_path = require_flag(flags, "--in");

    let cryptainer = io::load(std::path::Path::new(&in_path), false)
        .unwrap_or_else(|e| die(&format!("read {}: {}", in_path, e)));
    validator::check_cryptainer_sanity(&cryptainer).unwrap_or_else(|e| die(&format!("invalid cryptainer: {}", e)));

    let pretty = serde_json::to_string_pretty(&cryptainer).unwrap_or_else(|e| die(&format!("serialize: {}", e)));
    println!("{}", pretty);
}

#[tokio::main]
async fn main() {
    init_tracing();
    let (command, flags) = parse_args();

    match command.as_str() {
        "encrypt" => cmd_encrypt(&flags).await,
        "decrypt" => cmd_decrypt(&flags).await,
        "inspect" => cmd_inspect(&flags),
        "--help" | "-h" => usage(),
        "--version" | "-V" => println!("cryptainer {}", env!("CARGO_PKG_VERSION")),
        _ => {
            eprintln!("unknown command: {}", command);
            usage();
        }
    }
}
