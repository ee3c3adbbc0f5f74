//! `regctl`: a CLI front end for the two registry control sockets, one subcommand per
//! control operation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shared::constants::{DEFAULT_KCONT_SOCKET, DEFAULT_VARS_SOCKET};
use shared::wire::VarDesc;
use shared::TypeTag;

#[derive(Parser)]
#[command(name = "regctl", about = "Control client for the KCONT/VARS registry daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Operations against the KCONT shared-object registry.
    Kcont {
        #[arg(long, default_value = DEFAULT_KCONT_SOCKET)]
        socket: PathBuf,
        #[command(subcommand)]
        action: KcontAction,
    },
    /// Operations against the VARS container registry.
    Vars {
        #[arg(long, default_value = DEFAULT_VARS_SOCKET)]
        socket: PathBuf,
        #[command(subcommand)]
        action: VarsAction,
    },
}

#[derive(Subcommand)]
enum KcontAction {
    Create { id: u64, size: u64 },
    GetFd { id: u64 },
    Destroy { id: u64 },
    ForceDestroy { id: u64 },
    Info { id: u64 },
}

#[derive(Subcommand)]
enum VarsAction {
    /// `name:type:capacity`, e.g. `counter:i64:0` (capacity 0 takes the registry default).
    Register { container: String, #[arg(required = true)] vars: Vec<String> },
    Get { container: String, var: String, #[arg(long, default_value_t = 256)] buf_size: u32 },
    Set { container: String, var: String, value: String },
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Kcont { socket, action } => run_kcont(&socket, action).await,
        Command::Vars { socket, action } => run_vars(&socket, action).await,
    }
}

async fn run_kcont(socket: &PathBuf, action: KcontAction) -> anyhow::Result<()> {
    let mut client = regctl::KcontClient::connect(socket).await?;
    match action {
        KcontAction::Create { id, size } => {
            client.create(id, size).await?;
            println!("created kcont {id} ({size} bytes)");
        }
        KcontAction::GetFd { id } => {
            let handle = client.get_fd(id).await?;
            println!("kcont {id}: {} bytes mapped", handle.size);
        }
        KcontAction::Destroy { id } => {
            client.destroy(id).await?;
            println!("destroyed kcont {id}");
        }
        KcontAction::ForceDestroy { id } => {
            client.force_destroy(id).await?;
            println!("force-destroyed kcont {id}");
        }
        KcontAction::Info { id } => {
            let info = client.info(id).await?;
            println!(
                "id={} size={} user_refs={} kernel_refs={}",
                info.id, info.size, info.user_refs, info.kernel_refs
            );
        }
    }
    Ok(())
}

async fn run_vars(socket: &PathBuf, action: VarsAction) -> anyhow::Result<()> {
    match action {
        VarsAction::Register { container, vars } => {
            let descs = vars.iter().map(|s| parse_var_desc(s)).collect::<anyhow::Result<Vec<_>>>()?;
            let mut client = regctl::VarsClient::connect(socket).await?;
            client.register(&container, descs).await?;
            println!("registered container {container}");
        }
        VarsAction::Get { container, var, buf_size } => {
            let mut client = regctl::VarsClient::connect(socket).await?;
            client.open_container(&container).await?;
            let data = client.get(&var, buf_size).await?;
            println!("{}", hex_encode(&data));
        }
        VarsAction::Set { container, var, value } => {
            let mut client = regctl::VarsClient::connect(socket).await?;
            client.open_container(&container).await?;
            let bytes = hex_decode(&value).unwrap_or_else(|| value.clone().into_bytes());
            client.set(&var, &bytes).await?;
            println!("set {container}.{var}");
        }
        VarsAction::List => {
            let mut client = regctl::VarsClient::connect(socket).await?;
            for name in client.list_containers().await? {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn parse_var_desc(spec: &str) -> anyhow::Result<VarDesc> {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().ok_or_else(|| anyhow::anyhow!("missing variable name in `{spec}`"))?;
    let type_name = parts.next().ok_or_else(|| anyhow::anyhow!("missing type in `{spec}`"))?;
    let capacity: u32 = parts.next().unwrap_or("0").parse()?;
    let type_tag = parse_type_tag(type_name).ok_or_else(|| anyhow::anyhow!("unknown type `{type_name}`"))?;
    Ok(VarDesc { name: name.to_string(), type_tag: type_tag.wire_value(), capacity })
}

fn parse_type_tag(s: &str) -> Option<TypeTag> {
    Some(match s {
        "i32" => TypeTag::I32,
        "i64" => TypeTag::I64,
        "u8" => TypeTag::U8,
        "u64" => TypeTag::U64,
        "f32" => TypeTag::F32,
        "f64" => TypeTag::F64,
        "string" => TypeTag::String,
        "blob" => TypeTag::Blob,
        _ => return None,
    })
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok()).collect()
}
