//! Line-oriented wire format
//!
//! Every message is one newline-terminated line of space-separated tokens:
//!
//! ```text
//! * <sender> HELLO UNIDIR <ids...> BIDIR <ids...> MPR <ids...>
//! * <sender> TC <source> <seqno> MS <ids...>
//! <nextHop> <sender> DATA <originator> <destination> <payload...>
//! ```
//!
//! The leading `*` marks a broadcast; DATA lines are unicast to `nextHop`.
//! Encoding keeps the exact spacing of the line format (an empty set
//! renders as nothing between two keywords), decoding is token based.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use derive_more::Display as DeriveDisplay;

use crate::error::WireError;
use crate::identity::NodeId;

/// Marker token for broadcast lines
pub const BROADCAST: &str = "*";

/// Kind of a wire message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DeriveDisplay)]
pub enum MessageKind {
    #[display("HELLO")]
    Hello,
    #[display("TC")]
    Tc,
    #[display("DATA")]
    Data,
}

/// Neighbor sensing message, broadcast every hello interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloMessage {
    pub sender: NodeId,
    pub unidir: BTreeSet<NodeId>,
    pub bidir: BTreeSet<NodeId>,
    pub mpr: BTreeSet<NodeId>,
}

/// Topology control message, flooded through MPRs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcMessage {
    /// Neighbor that put this copy on the air
    pub sender: NodeId,
    /// Node that originated the TC
    pub source: NodeId,
    /// Originator's MS version
    pub seqno: u64,
    /// Originator's MPR selectors
    pub ms: BTreeSet<NodeId>,
}

impl TcMessage {
    /// Copy of this TC as relayed by `relay`
    pub fn relayed_by(&self, relay: &NodeId) -> Self {
        Self {
            sender: relay.clone(),
            ..self.clone()
        }
    }
}

/// Application payload forwarded hop by hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMessage {
    pub next_hop: NodeId,
    pub sender: NodeId,
    pub originator: NodeId,
    pub destination: NodeId,
    pub payload: String,
}

impl DataMessage {
    /// Copy of this message rewritten for the next hop
    pub fn forwarded(&self, next_hop: NodeId, sender: NodeId) -> Self {
        Self {
            next_hop,
            sender,
            ..self.clone()
        }
    }
}

/// A decoded wire line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Hello(HelloMessage),
    Tc(TcMessage),
    Data(DataMessage),
}

impl Message {
    /// Decode one line (with or without its trailing newline)
    pub fn parse(line: &str) -> Result<Self, WireError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(WireError::Empty);
        }
        if tokens.len() < 3 {
            return Err(WireError::Truncated(line.trim_end().to_string()));
        }

        match tokens[2] {
            "HELLO" => parse_hello(&tokens).map(Message::Hello),
            "TC" => parse_tc(&tokens).map(Message::Tc),
            "DATA" => parse_data(&tokens).map(Message::Data),
            other => Err(WireError::UnknownKind(other.to_string())),
        }
    }

    /// Kind of this message
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Hello(_) => MessageKind::Hello,
            Message::Tc(_) => MessageKind::Tc,
            Message::Data(_) => MessageKind::Data,
        }
    }

    /// Node that transmitted this copy
    pub fn sender(&self) -> &NodeId {
        match self {
            Message::Hello(m) => &m.sender,
            Message::Tc(m) => &m.sender,
            Message::Data(m) => &m.sender,
        }
    }

    /// Encoded line including the terminating newline
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Message::Hello(m) => write!(
                f,
                "{BROADCAST} {} HELLO UNIDIR {} BIDIR {} MPR {}",
                m.sender,
                join(&m.unidir),
                join(&m.bidir),
                join(&m.mpr)
            ),
            Message::Tc(m) => write!(
                f,
                "{BROADCAST} {} TC {} {} MS {}",
                m.sender,
                m.source,
                m.seqno,
                join(&m.ms)
            ),
            Message::Data(m) => write!(
                f,
                "{} {} DATA {} {} {}",
                m.next_hop, m.sender, m.originator, m.destination, m.payload
            ),
        }
    }
}

impl From<HelloMessage> for Message {
    fn from(m: HelloMessage) -> Self {
        Message::Hello(m)
    }
}

impl From<TcMessage> for Message {
    fn from(m: TcMessage) -> Self {
        Message::Tc(m)
    }
}

impl From<DataMessage> for Message {
    fn from(m: DataMessage) -> Self {
        Message::Data(m)
    }
}

fn join(ids: &BTreeSet<NodeId>) -> String {
    ids.iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

fn expect_broadcast(tokens: &[&str]) -> Result<(), WireError> {
    if tokens[0] == BROADCAST {
        Ok(())
    } else {
        Err(WireError::NotBroadcast(tokens[0].to_string()))
    }
}

fn ids(tokens: &[&str]) -> Result<BTreeSet<NodeId>, WireError> {
    tokens
        .iter()
        .map(|t| NodeId::new(*t).map_err(WireError::from))
        .collect()
}

fn position(
    tokens: &[&str],
    from: usize,
    kind: &'static str,
    keyword: &'static str,
) -> Result<usize, WireError> {
    tokens[from..]
        .iter()
        .position(|t| *t == keyword)
        .map(|p| p + from)
        .ok_or(WireError::MissingKeyword { kind, keyword })
}

fn parse_hello(tokens: &[&str]) -> Result<HelloMessage, WireError> {
    expect_broadcast(tokens)?;
    let sender = NodeId::new(tokens[1])?;
    if tokens.get(3) != Some(&"UNIDIR") {
        return Err(WireError::MissingKeyword {
            kind: "HELLO",
            keyword: "UNIDIR",
        });
    }
    let unidir_at = 3;
    let bidir_at = position(tokens, unidir_at + 1, "HELLO", "BIDIR")?;
    let mpr_at = position(tokens, bidir_at + 1, "HELLO", "MPR")?;

    Ok(HelloMessage {
        sender,
        unidir: ids(&tokens[unidir_at + 1..bidir_at])?,
        bidir: ids(&tokens[bidir_at + 1..mpr_at])?,
        mpr: ids(&tokens[mpr_at + 1..])?,
    })
}

fn parse_tc(tokens: &[&str]) -> Result<TcMessage, WireError> {
    expect_broadcast(tokens)?;
    if tokens.len() < 6 {
        return Err(WireError::Truncated(tokens.join(" ")));
    }
    let sender = NodeId::new(tokens[1])?;
    let source = NodeId::new(tokens[3])?;
    let seqno = tokens[4]
        .parse::<u64>()
        .map_err(|_| WireError::InvalidSequence(tokens[4].to_string()))?;
    if tokens[5] != "MS" {
        return Err(WireError::MissingKeyword {
            kind: "TC",
            keyword: "MS",
        });
    }

    Ok(TcMessage {
        sender,
        source,
        seqno,
        ms: ids(&tokens[6..])?,
    })
}

fn parse_data(tokens: &[&str]) -> Result<DataMessage, WireError> {
    if tokens.len() < 5 {
        return Err(WireError::Truncated(tokens.join(" ")));
    }

    Ok(DataMessage {
        next_hop: NodeId::new(tokens[0])?,
        sender: NodeId::new(tokens[1])?,
        originator: NodeId::new(tokens[3])?,
        destination: NodeId::new(tokens[4])?,
        payload: tokens[5..].join(" "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    fn set(ids: &[&str]) -> BTreeSet<NodeId> {
        ids.iter().map(|s| id(s)).collect()
    }

    #[test]
    fn test_hello_encoding_keeps_empty_set_spacing() {
        let hello = Message::Hello(HelloMessage {
            sender: id("A"),
            unidir: BTreeSet::new(),
            bidir: set(&["B", "C"]),
            mpr: BTreeSet::new(),
        });
        assert_eq!(hello.to_line(), "* A HELLO UNIDIR  BIDIR B C MPR \n");
    }

    #[test]
    fn test_parse_hello_with_empty_sets() {
        let msg = Message::parse("* A HELLO UNIDIR  BIDIR  MPR \n").unwrap();
        let Message::Hello(hello) = msg else {
            panic!("expected HELLO");
        };
        assert_eq!(hello.sender, id("A"));
        assert!(hello.unidir.is_empty());
        assert!(hello.bidir.is_empty());
        assert!(hello.mpr.is_empty());
    }

    #[test]
    fn test_parse_hello_sets() {
        let msg = Message::parse("* B HELLO UNIDIR D BIDIR A C MPR C").unwrap();
        let Message::Hello(hello) = msg else {
            panic!("expected HELLO");
        };
        assert_eq!(hello.unidir, set(&["D"]));
        assert_eq!(hello.bidir, set(&["A", "C"]));
        assert_eq!(hello.mpr, set(&["C"]));
    }

    #[test]
    fn test_parse_tc() {
        let msg = Message::parse("* B TC C 12 MS D E\n").unwrap();
        assert_eq!(msg.kind(), MessageKind::Tc);
        let Message::Tc(tc) = msg else {
            panic!("expected TC");
        };
        assert_eq!(tc.sender, id("B"));
        assert_eq!(tc.source, id("C"));
        assert_eq!(tc.seqno, 12);
        assert_eq!(tc.ms, set(&["D", "E"]));
    }

    #[test]
    fn test_tc_relay_rewrites_sender_only() {
        let tc = TcMessage {
            sender: id("B"),
            source: id("C"),
            seqno: 3,
            ms: set(&["B"]),
        };
        let relayed = tc.relayed_by(&id("A"));
        assert_eq!(
            Message::Tc(relayed).to_line(),
            "* A TC C 3 MS B\n"
        );
    }

    #[test]
    fn test_parse_data_keeps_payload_tokens() {
        let msg = Message::parse("B A DATA A D hello there world\n").unwrap();
        let Message::Data(data) = msg else {
            panic!("expected DATA");
        };
        assert_eq!(data.next_hop, id("B"));
        assert_eq!(data.sender, id("A"));
        assert_eq!(data.originator, id("A"));
        assert_eq!(data.destination, id("D"));
        assert_eq!(data.payload, "hello there world");
        assert_eq!(
            Message::Data(data).to_line(),
            "B A DATA A D hello there world\n"
        );
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(Message::parse("\n"), Err(WireError::Empty));
        assert!(matches!(
            Message::parse("* A"),
            Err(WireError::Truncated(_))
        ));
        assert!(matches!(
            Message::parse("* A PING"),
            Err(WireError::UnknownKind(_))
        ));
        assert!(matches!(
            Message::parse("* A HELLO UNIDIR BIDIR B"),
            Err(WireError::MissingKeyword { keyword: "MPR", .. })
        ));
        assert!(matches!(
            Message::parse("* A TC C x MS"),
            Err(WireError::InvalidSequence(_))
        ));
        assert!(matches!(
            Message::parse("B A HELLO UNIDIR BIDIR MPR"),
            Err(WireError::NotBroadcast(_))
        ));
    }

    #[test]
    fn test_hello_requires_unidir_right_after_kind() {
        assert!(matches!(
            Message::parse("* A HELLO junk UNIDIR  BIDIR  MPR"),
            Err(WireError::MissingKeyword { keyword: "UNIDIR", .. })
        ));
        assert!(matches!(
            Message::parse("* A HELLO"),
            Err(WireError::MissingKeyword { keyword: "UNIDIR", .. })
        ));
    }
}
