#![forbid(unsafe_code)]

//! Tryvann CLI: integrity containers and enveloped XML signatures.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tryvann_container::{ContainerConfig, IntegrityContainer, IntegrityContainerEngine};
use tryvann_core::{Error, HashType, DEFAULT_HASH_TYPE};
use tryvann_dsig::DsigContext;
use tryvann_keys::{loader, Key, X509Certificate};
use tryvann_xml::XmlDocument;

#[derive(Parser)]
#[command(
    name = "tryvann",
    about = "Tryvann: integrity containers and enveloped XML signatures",
    version
)]
struct Cli {
    /// Log engine steps (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seal a message into an integrity container (JSON on stdout)
    Seal {
        /// The message to seal
        message: String,

        /// AES key file (base64, or hex with --hex)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Key file is hex instead of base64
        #[arg(long)]
        hex: bool,

        /// HMAC algorithm, e.g. HMAC_SHA_256 or HmacSHA256
        #[arg(long)]
        hash: Option<HashType>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a message against an integrity container
    Unseal {
        /// Container JSON file
        container: PathBuf,

        /// The message to check
        message: String,

        /// AES key file (base64, or hex with --hex)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Key file is hex instead of base64
        #[arg(long)]
        hex: bool,
    },

    /// Sign an XML document with an HMAC key
    SignHmac {
        /// Input XML file
        file: PathBuf,

        /// HMAC key file (base64, or hex with --hex)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Key file is hex instead of base64
        #[arg(long)]
        hex: bool,

        /// HMAC algorithm
        #[arg(long, default_value = "HMAC_SHA_256")]
        hash: HashType,

        /// Reference URI, e.g. "#allTheCarsInTheWorld"
        #[arg(short = 'r', long)]
        reference: String,

        /// Id of the Signature element
        #[arg(long)]
        id: Option<String>,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sign an XML document with an RSA or DSA key and its certificate
    SignCert {
        /// Input XML file
        file: PathBuf,

        /// Private key (PEM or DER)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// X.509 certificate (PEM or DER)
        #[arg(long)]
        cert: PathBuf,

        /// Reference URI, e.g. "#allTheCarsInTheWorld"
        #[arg(short = 'r', long)]
        reference: String,

        /// Id of the Signature element
        #[arg(long)]
        id: Option<String>,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify an HMAC-signed XML document
    VerifyHmac {
        /// Input XML file
        file: PathBuf,

        /// HMAC key file (base64, or hex with --hex)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Key file is hex instead of base64
        #[arg(long)]
        hex: bool,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,
    },

    /// Verify a certificate-signed XML document
    VerifyCert {
        /// Input XML file
        file: PathBuf,

        /// X.509 certificate (default: the one embedded in KeyInfo)
        #[arg(long)]
        cert: Option<PathBuf>,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match cli.command {
        Commands::Seal {
            message,
            key,
            hex,
            hash,
            output,
        } => cmd_seal(&message, &key, hex, hash, output).map(|()| true),

        Commands::Unseal {
            container,
            message,
            key,
            hex,
        } => cmd_unseal(&container, &message, &key, hex),

        Commands::SignHmac {
            file,
            key,
            hex,
            hash,
            reference,
            id,
            id_attr,
            output,
        } => {
            let signing = SigningArgs {
                file: &file,
                reference: &reference,
                id: id.as_deref(),
                id_attr: &id_attr,
                output,
            };
            cmd_sign_hmac(signing, &key, hex, hash).map(|()| true)
        }

        Commands::SignCert {
            file,
            key,
            cert,
            reference,
            id,
            id_attr,
            output,
        } => {
            let signing = SigningArgs {
                file: &file,
                reference: &reference,
                id: id.as_deref(),
                id_attr: &id_attr,
                output,
            };
            cmd_sign_cert(signing, &key, &cert).map(|()| true)
        }

        Commands::VerifyHmac {
            file,
            key,
            hex,
            id_attr,
        } => cmd_verify_hmac(&file, &key, hex, &id_attr),

        Commands::VerifyCert {
            file,
            cert,
            id_attr,
        } => cmd_verify_cert(&file, cert.as_deref(), &id_attr),
    };

    match result {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("INVALID");
            process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

struct SigningArgs<'a> {
    file: &'a Path,
    reference: &'a str,
    id: Option<&'a str>,
    id_attr: &'a [String],
    output: Option<PathBuf>,
}

fn cmd_seal(
    message: &str,
    key_path: &Path,
    hex: bool,
    hash: Option<HashType>,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let key = read_symmetric_key(key_path, HashType::Aes, hex)?;
    let engine = IntegrityContainerEngine::new(ContainerConfig {
        default_hash: hash.unwrap_or(DEFAULT_HASH_TYPE),
    })?;
    let container = engine
        .generate(Some(&key), message)?
        .ok_or_else(|| Error::InvalidArgument("no container produced".into()))?;
    let mut json = container.to_json()?;
    json.push('\n');
    write_output(output, json.as_bytes())
}

fn cmd_unseal(container_path: &Path, message: &str, key_path: &Path, hex: bool) -> Result<bool, Error> {
    let container = IntegrityContainer::from_json(&read_file(container_path)?)?;
    let key = read_symmetric_key(key_path, HashType::Aes, hex)?;
    let valid = IntegrityContainerEngine::default().verify_container(Some(&key), &container, message)?;
    if valid {
        println!("OK");
    }
    Ok(valid)
}

fn cmd_sign_hmac(args: SigningArgs<'_>, key_path: &Path, hex: bool, hash: HashType) -> Result<(), Error> {
    let key = read_symmetric_key(key_path, hash, hex)?;
    let ctx = build_context(args.id_attr);
    let mut document = read_document(args.file)?;
    log::info!("signing {} with {hash}", args.file.display());
    tryvann_dsig::sign_by_key(&ctx, &mut document, args.reference, args.id, &key, hash)?;
    write_output(args.output, document.text().as_bytes())
}

fn cmd_sign_cert(args: SigningArgs<'_>, key_path: &Path, cert_path: &Path) -> Result<(), Error> {
    let key = loader::load_key_file(key_path)?;
    let cert = X509Certificate::from_file(cert_path)?;
    let ctx = build_context(args.id_attr);
    let mut document = read_document(args.file)?;
    log::info!(
        "signing {} as {}",
        args.file.display(),
        cert.subject_name()
    );
    tryvann_dsig::sign_by_certificate(&ctx, &mut document, args.reference, args.id, &key, &cert)?;
    write_output(args.output, document.text().as_bytes())
}

fn cmd_verify_hmac(file: &Path, key_path: &Path, hex: bool, id_attr: &[String]) -> Result<bool, Error> {
    let key = read_symmetric_key(key_path, DEFAULT_HASH_TYPE, hex)?;
    let document = read_document(file)?;
    let valid = tryvann_dsig::validate_by_key(&build_context(id_attr), &document, &key)?;
    report(&document, valid)
}

fn cmd_verify_cert(file: &Path, cert_path: Option<&Path>, id_attr: &[String]) -> Result<bool, Error> {
    let document = read_document(file)?;
    let cert = match cert_path {
        Some(path) => X509Certificate::from_file(path)?,
        None => tryvann_dsig::embedded_certificate(&document)?.ok_or_else(|| {
            Error::InvalidArgument("no --cert given and the signature embeds no certificate".into())
        })?,
    };
    let valid = tryvann_dsig::validate_by_certificate(&build_context(id_attr), &document, &cert)?;
    report(&document, valid)
}

// ── Utility functions ────────────────────────────────────────────────

fn report(document: &XmlDocument, valid: bool) -> Result<bool, Error> {
    if valid {
        match tryvann_dsig::find_signature_id(document)? {
            Some(id) => println!("OK ({id})"),
            None => println!("OK"),
        }
    }
    Ok(valid)
}

fn build_context(id_attr: &[String]) -> DsigContext {
    let mut ctx = DsigContext::new();
    for attr in id_attr {
        ctx.add_id_attr(attr);
    }
    ctx
}

fn read_symmetric_key(path: &Path, algorithm: HashType, hex: bool) -> Result<Key, Error> {
    let text = read_file(path)?;
    if hex {
        loader::symmetric_from_hex(algorithm, &text)
    } else {
        loader::symmetric_from_base64(algorithm, &text)
    }
}

fn read_document(path: &Path) -> Result<XmlDocument, Error> {
    let data = std::fs::read(path).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
    })?;
    XmlDocument::parse_bytes(&data)
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
    })
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", p.display())))
        }),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(data).map_err(Error::Io)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seal() {
        let cli = Cli::try_parse_from(["tryvann", "-v", "seal", "hello", "-k", "aes.key", "--hash", "HmacSHA256"])
            .unwrap();
        assert!(cli.verbose);
        let Commands::Seal { message, hash, hex, .. } = cli.command else {
            panic!("expected seal");
        };
        assert_eq!(message, "hello");
        assert_eq!(hash, Some(HashType::HmacSha256));
        assert!(!hex);
    }

    #[test]
    fn test_parse_sign_hmac_defaults() {
        let cli = Cli::try_parse_from([
            "tryvann",
            "sign-hmac",
            "doc.xml",
            "-k",
            "hmac.key",
            "-r",
            "#allTheCarsInTheWorld",
        ])
        .unwrap();
        let Commands::SignHmac { hash, id, reference, .. } = cli.command else {
            panic!("expected sign-hmac");
        };
        assert_eq!(hash, HashType::HmacSha256);
        assert_eq!(id, None);
        assert_eq!(reference, "#allTheCarsInTheWorld");
    }

    #[test]
    fn test_rejects_unknown_hash() {
        assert!(Cli::try_parse_from(["tryvann", "seal", "m", "-k", "k", "--hash", "HmacWhirlpool"]).is_err());
    }

    #[test]
    fn test_verify_cert_without_cert() {
        let cli = Cli::try_parse_from(["tryvann", "verify-cert", "signed.xml"]).unwrap();
        assert!(matches!(cli.command, Commands::VerifyCert { cert: None, .. }));
    }
}
