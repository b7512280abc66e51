//! Text and JSON output.

use std::io::{self, Write};

use nlmsg::netlink::genl::FamilyInfo;
use nlmsg::netlink::rtnl::{LinkEvent, LinkInfo, RouteInfo};
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text output.
    Text,
    /// JSON output.
    Json { pretty: bool },
}

/// Records that know how to print themselves as text.
trait Printable: Serialize {
    fn print_text<W: Write>(&self, w: &mut W) -> io::Result<()>;
}

impl Printable for FamilyInfo {
    fn print_text<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(
            w,
            "{} id {} version {} hdrsize {} maxattr {}",
            self.name, self.id, self.version, self.hdr_size, self.max_attr
        )?;
        for (id, flags) in &self.ops {
            writeln!(w, "    op {} flags 0x{:02x}", id, flags)?;
        }
        for (id, name) in &self.mcast_groups {
            writeln!(w, "    group {} id {}", name, id)?;
        }
        Ok(())
    }
}

impl Printable for LinkInfo {
    fn print_text<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "{}: {}:", self.index, self.ifname.as_deref().unwrap_or("?"))?;
        write!(w, " <{}>", if self.is_up() { "UP" } else { "DOWN" })?;
        if let Some(mtu) = self.mtu {
            write!(w, " mtu {}", mtu)?;
        }
        if let Some(state) = self.operstate {
            write!(w, " state {}", state.name())?;
        }
        if let Some(qlen) = self.txqlen {
            write!(w, " qlen {}", qlen)?;
        }
        writeln!(w)?;
        if let Some(ref addr) = self.address {
            writeln!(w, "    link/ether {}", addr)?;
        }
        Ok(())
    }
}

impl Printable for RouteInfo {
    fn print_text<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "{}", self.destination())?;
        if let Some(gw) = self.gateway {
            write!(w, " via {}", gw)?;
        }
        if let Some(oif) = self.oif {
            write!(w, " dev {}", oif)?;
        }
        write!(w, " table {}", self.table)?;
        if let Some(src) = self.prefsrc {
            write!(w, " src {}", src)?;
        }
        if let Some(metric) = self.priority {
            write!(w, " metric {}", metric)?;
        }
        writeln!(w)
    }
}

impl Printable for LinkEvent {
    fn print_text<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "[{}] ", self.action())?;
        self.link().print_text(w)
    }
}

fn print_list<T: Printable>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut w = stdout.lock();

    match format {
        OutputFormat::Text => {
            for item in items {
                item.print_text(&mut w)?;
            }
        }
        OutputFormat::Json { pretty } => {
            if pretty {
                serde_json::to_writer_pretty(&mut w, items)?;
            } else {
                serde_json::to_writer(&mut w, items)?;
            }
            writeln!(w)?;
        }
    }
    Ok(())
}

pub fn print_families(families: &[FamilyInfo], format: OutputFormat) -> anyhow::Result<()> {
    print_list(families, format)
}

pub fn print_links(links: &[LinkInfo], format: OutputFormat) -> anyhow::Result<()> {
    print_list(links, format)
}

pub fn print_routes(routes: &[RouteInfo], format: OutputFormat) -> anyhow::Result<()> {
    print_list(routes, format)
}

/// Print one event; JSON output is one object per line.
pub fn print_event(event: &LinkEvent, format: OutputFormat) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut w = stdout.lock();

    match format {
        OutputFormat::Text => event.print_text(&mut w)?,
        OutputFormat::Json { pretty } => {
            if pretty {
                serde_json::to_writer_pretty(&mut w, event)?;
            } else {
                serde_json::to_writer(&mut w, event)?;
            }
            writeln!(w)?;
        }
    }
    w.flush()?;
    Ok(())
}
