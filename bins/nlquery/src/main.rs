//! nlquery - query the kernel over netlink.

mod output;

use std::net::IpAddr;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use nlmsg::netlink::genl;
use nlmsg::netlink::rtnl::{LinkMonitor, link, route};
use nlmsg::{NetlinkSocket, Protocol};

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "nlquery", version, about = "Netlink query tool")]
struct Cli {
    /// Use IPv4 only.
    #[arg(short = '4')]
    ipv4: bool,

    /// Use IPv6 only.
    #[arg(short = '6')]
    ipv6: bool,

    /// Output JSON.
    #[arg(short = 'j', long)]
    json: bool,

    /// Pretty print JSON.
    #[arg(short = 'p', long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a generic netlink family by name.
    Family {
        /// Family name (e.g. nl80211).
        name: String,
    },

    /// List generic netlink families.
    Families,

    /// List network interfaces.
    #[command(visible_alias = "l")]
    Links,

    /// List routes.
    #[command(visible_alias = "r")]
    Routes,

    /// Bring an interface up or down.
    LinkSet {
        /// Interface name.
        ifname: String,

        /// New administrative state.
        #[arg(value_enum)]
        state: LinkState,
    },

    /// Add a unicast route to the main table.
    RouteAdd {
        /// Destination, as ADDR or ADDR/LEN.
        #[arg(value_parser = parse_prefix)]
        dst: Prefix,

        /// Output interface name.
        dev: String,

        /// Gateway address.
        #[arg(long)]
        via: Option<IpAddr>,
    },

    /// Print link changes as they happen.
    #[command(visible_alias = "m")]
    Monitor {
        /// Stop after this many events.
        #[arg(short = 'c', long)]
        count: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LinkState {
    Up,
    Down,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json { pretty: cli.pretty }
    } else {
        OutputFormat::Text
    };

    let family = match (cli.ipv4, cli.ipv6) {
        (true, false) => libc::AF_INET as u8,
        (false, true) => libc::AF_INET6 as u8,
        _ => libc::AF_UNSPEC as u8,
    };

    if let Err(e) = run(cli.command, format, family) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn run(command: Command, format: OutputFormat, family: u8) -> anyhow::Result<()> {
    match command {
        Command::Family { name } => {
            let socket = NetlinkSocket::new(Protocol::Generic)?;
            let info = genl::resolve_family(&socket, &name)?;
            output::print_families(std::slice::from_ref(&info), format)
        }
        Command::Families => {
            let socket = NetlinkSocket::new(Protocol::Generic)?;
            let families = genl::list_families(&socket)?;
            output::print_families(&families, format)
        }
        Command::Links => {
            let socket = NetlinkSocket::new(Protocol::Route)?;
            let links = link::list_links(&socket)?;
            output::print_links(&links, format)
        }
        Command::Routes => {
            let socket = NetlinkSocket::new(Protocol::Route)?;
            let routes = route::list_routes(&socket, family)?;
            output::print_routes(&routes, format)
        }
        Command::LinkSet { ifname, state } => {
            let socket = NetlinkSocket::new(Protocol::Route)?;
            let up = matches!(state, LinkState::Up);
            link::set_link_state(&socket, &ifname, up)?;
            tracing::debug!(%ifname, up, "link state changed");
            Ok(())
        }
        Command::RouteAdd { dst, dev, via } => {
            let socket = NetlinkSocket::new(Protocol::Route)?;
            let oif = link::list_links(&socket)?
                .into_iter()
                .find(|l| l.ifname.as_deref() == Some(dev.as_str()))
                .map(|l| l.index as u32)
                .with_context(|| format!("interface {} not found", dev))?;
            route::add_route(&socket, dst.addr, dst.len, oif, via)?;
            tracing::debug!(dst = %dst.addr, len = dst.len, oif, "route added");
            Ok(())
        }
        Command::Monitor { count } => {
            let monitor = LinkMonitor::new()?;
            for event in monitor.take(count.unwrap_or(usize::MAX)) {
                output::print_event(&event?, format)?;
            }
            Ok(())
        }
    }
}

/// Route destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Prefix {
    addr: IpAddr,
    len: u8,
}

/// Parse `ADDR` or `ADDR/LEN`; a bare address is a host route.
fn parse_prefix(s: &str) -> Result<Prefix, String> {
    let (addr, len) = match s.split_once('/') {
        Some((addr, len)) => (addr, Some(len)),
        None => (s, None),
    };
    let addr: IpAddr = addr
        .parse()
        .map_err(|_| format!("invalid address: {}", addr))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    let len = match len {
        Some(len) => len
            .parse::<u8>()
            .map_err(|_| format!("invalid prefix length: {}", len))?,
        None => max,
    };
    if len > max {
        return Err(format!("prefix length {} exceeds {}", len, max));
    }
    Ok(Prefix { addr, len })
}
