//! Single-connection, synchronous client for the introspection handshake.
//!
//! Drop-sends-Terminate, a flat request/response API for Parse/Describe/Sync
//! and simple Query in place of a state-machine-driven connect loop that also
//! negotiates SSL and dispatches to a pluggable query handler. No SSL
//! negotiation branch exists since TLS is out of scope.
//!
//! `recv` owns a growable receive buffer and drives it through
//! `protocol::backend::read_message`: refill from the socket when the buffer
//! doesn't yet hold a full frame, then compact out the consumed bytes once it
//! does.

use std::io::{BufWriter, Read, Write};
use std::net::TcpStream;

use tracing::debug;

use crate::auth;
use crate::config::DatabaseUrl;
use crate::error::{Error, Result};
use crate::protocol::backend::{self, auth::AuthenticationMessage, BackendKeyData};
use crate::protocol::frontend;
use crate::protocol::types::TransactionStatus;

/// An owned backend message: the type byte plus its payload, read off the wire.
///
/// Parsing functions in `protocol::backend` borrow from `payload`, so callers
/// parse immediately after `recv` returns rather than holding onto the message.
pub struct Message {
    pub type_byte: u8,
    pub payload: Vec<u8>,
}

/// Receive buffer grows by this much each time `read_message` reports it
/// needs more data than the buffer currently holds.
const RECV_CHUNK: usize = 8192;

/// A live connection to a PostgreSQL server, past the authentication handshake.
pub struct Connection {
    reader: TcpStream,
    writer: BufWriter<TcpStream>,
    recv_buf: Vec<u8>,
    recv_len: usize,
    write_buf: Vec<u8>,
    backend_key: Option<(u32, u32)>,
    server_params: Vec<(String, String)>,
    transaction_status: TransactionStatus,
    scram: Option<auth::scram::ScramState>,
}

impl Connection {
    /// Connect and authenticate against `url`.
    pub fn connect(url: &DatabaseUrl) -> Result<Self> {
        let addr = format!("{}:{}", url.host, url.port);
        let stream = TcpStream::connect(&addr)
            .map_err(|e| Error::Connection(format!("{addr}: {e}")))?;
        stream.set_nodelay(true)?;

        let reader = stream.try_clone()?;
        let writer = BufWriter::new(stream);

        let mut conn = Self {
            reader,
            writer,
            recv_buf: vec![0u8; RECV_CHUNK],
            recv_len: 0,
            write_buf: Vec::with_capacity(8192),
            backend_key: None,
            server_params: Vec::new(),
            transaction_status: TransactionStatus::Idle,
            scram: None,
        };

        conn.start_up(url)?;
        Ok(conn)
    }

    fn start_up(&mut self, url: &DatabaseUrl) -> Result<()> {
        self.write_buf.clear();
        let mut params = vec![("user", url.user.as_str())];
        params.push(("database", url.database.as_str()));
        frontend::write_startup(&mut self.write_buf, &params);
        self.flush()?;

        loop {
            let msg = self.recv()?;
            match msg.type_byte {
                backend::msg_type::AUTHENTICATION => {
                    if self.handle_auth_message(&msg, url)? {
                        continue;
                    }
                }
                backend::msg_type::BACKEND_KEY_DATA => {
                    let data = BackendKeyData::parse(&msg.payload)?;
                    self.backend_key = Some((data.process_id(), data.secret()));
                }
                backend::msg_type::PARAMETER_STATUS => {
                    let ps = backend::ParameterStatus::parse(&msg.payload)?;
                    self.server_params.push((ps.name.to_string(), ps.value.to_string()));
                }
                backend::msg_type::READY_FOR_QUERY => {
                    let rfq = backend::ReadyForQuery::parse(&msg.payload)?;
                    self.transaction_status = rfq.transaction_status().unwrap_or(TransactionStatus::Idle);
                    return Ok(());
                }
                backend::msg_type::ERROR_RESPONSE => {
                    let err = backend::ErrorResponse::parse(&msg.payload)?;
                    return Err(Error::Authentication(err.fields.to_string()));
                }
                backend::msg_type::NOTICE_RESPONSE => {
                    let notice = backend::NoticeResponse::parse(&msg.payload)?;
                    debug!(message = notice.message(), "server notice during startup");
                }
                other => {
                    return Err(Error::Protocol(format!(
                        "unexpected message {:?} during startup",
                        other as char
                    )));
                }
            }
        }
    }

    /// Handle one AuthenticationXXX message, driving cleartext/MD5/SCRAM as needed.
    /// Returns `Ok(true)` if startup should keep reading (authentication is ongoing
    /// or complete but more startup messages are still expected).
    fn handle_auth_message(&mut self, msg: &Message, url: &DatabaseUrl) -> Result<bool> {
        match AuthenticationMessage::parse(&msg.payload)? {
            AuthenticationMessage::Ok => Ok(true),
            AuthenticationMessage::CleartextPassword => {
                let password = url.password.as_deref().ok_or_else(|| {
                    Error::Authentication("server requires a password but none was provided".into())
                })?;
                self.write_buf.clear();
                frontend::write_password(&mut self.write_buf, password);
                self.flush()?;
                Ok(true)
            }
            AuthenticationMessage::Md5Password { salt } => {
                let password = url.password.as_deref().ok_or_else(|| {
                    Error::Authentication("server requires a password but none was provided".into())
                })?;
                let hashed = auth::md5::md5_password(&url.user, password, &salt);
                self.write_buf.clear();
                frontend::write_password(&mut self.write_buf, &hashed);
                self.flush()?;
                Ok(true)
            }
            AuthenticationMessage::Sasl { mechanisms } => {
                if !mechanisms.iter().any(|m| *m == "SCRAM-SHA-256") {
                    return Err(Error::Authentication(
                        "server does not offer SCRAM-SHA-256".into(),
                    ));
                }
                let password = url.password.as_deref().ok_or_else(|| {
                    Error::Authentication("server requires a password but none was provided".into())
                })?;
                let scram = auth::scram::ScramState::new(password);
                self.write_buf.clear();
                frontend::write_sasl_initial_response(
                    &mut self.write_buf,
                    "SCRAM-SHA-256",
                    scram.client_first().as_bytes(),
                );
                self.flush()?;
                self.scram = Some(scram);
                Ok(true)
            }
            AuthenticationMessage::SaslContinue { data } => {
                let server_first = std::str::from_utf8(data)
                    .map_err(|e| Error::Authentication(format!("invalid UTF-8 in server-first-message: {e}")))?;
                let scram = self
                    .scram
                    .as_mut()
                    .ok_or_else(|| Error::Authentication("SASLContinue with no SCRAM state".into()))?;
                let client_final = scram.client_final(server_first)?;
                self.write_buf.clear();
                frontend::write_sasl_response(&mut self.write_buf, client_final.as_bytes());
                self.flush()?;
                Ok(true)
            }
            AuthenticationMessage::SaslFinal { data } => {
                let server_final = std::str::from_utf8(data)
                    .map_err(|e| Error::Authentication(format!("invalid UTF-8 in server-final-message: {e}")))?;
                let scram = self
                    .scram
                    .as_ref()
                    .ok_or_else(|| Error::Authentication("SASLFinal with no SCRAM state".into()))?;
                scram.verify_server_final(server_final)?;
                Ok(true)
            }
            other => Err(Error::Authentication(format!(
                "unsupported authentication method: {other:?}"
            ))),
        }
    }

    /// Server parameters reported during startup (`server_version`, `client_encoding`, ...).
    pub fn server_params(&self) -> &[(String, String)] {
        &self.server_params
    }

    /// Backend process ID and cancellation secret key, if the server sent one.
    pub fn backend_key(&self) -> Option<(u32, u32)> {
        self.backend_key
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.write_all(&self.write_buf)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read one full message off the wire: refill the receive buffer until
    /// `read_message` can frame a complete one, then compact out the bytes
    /// it consumed.
    fn recv(&mut self) -> Result<Message> {
        loop {
            if let Some((raw, consumed)) = backend::read_message(&self.recv_buf[..self.recv_len])? {
                let msg = Message { type_byte: raw.type_byte, payload: raw.payload.to_vec() };
                self.recv_buf.copy_within(consumed..self.recv_len, 0);
                self.recv_len -= consumed;
                return Ok(msg);
            }
            self.fill_recv_buf()?;
        }
    }

    /// Read more bytes from the socket into the tail of the receive buffer,
    /// growing it first if it's already full.
    fn fill_recv_buf(&mut self) -> Result<()> {
        if self.recv_len == self.recv_buf.len() {
            self.recv_buf.resize(self.recv_buf.len() + RECV_CHUNK, 0);
        }
        let n = self.reader.read(&mut self.recv_buf[self.recv_len..])?;
        if n == 0 {
            return Err(Error::Connection("server closed the connection".into()));
        }
        self.recv_len += n;
        Ok(())
    }

    /// Send Parse for an unnamed statement, then Describe(statement) and Sync,
    /// returning the ParameterDescription and RowDescription (or NoData) the
    /// server replies with.
    pub fn describe_query(&mut self, sql: &str) -> Result<DescribedQuery> {
        self.write_buf.clear();
        frontend::write_parse(&mut self.write_buf, "", sql, &[]);
        frontend::write_describe_statement(&mut self.write_buf, "");
        frontend::write_close_statement(&mut self.write_buf, "");
        frontend::write_sync(&mut self.write_buf);
        self.flush()?;

        let mut param_oids = Vec::new();
        let mut columns = Vec::new();
        let mut server_error = None;

        loop {
            let msg = self.recv()?;
            match msg.type_byte {
                backend::msg_type::PARSE_COMPLETE => {}
                backend::msg_type::PARAMETER_DESCRIPTION => {
                    let pd = backend::ParameterDescription::parse(&msg.payload)?;
                    param_oids = pd.oids().to_vec();
                }
                backend::msg_type::ROW_DESCRIPTION => {
                    let rd = backend::RowDescription::parse(&msg.payload)?;
                    columns = rd
                        .iter()
                        .map(|f| ColumnDescription {
                            name: f.name.to_string(),
                            type_oid: f.type_oid(),
                            table_oid: f.table_oid(),
                            column_id: f.column_id(),
                        })
                        .collect();
                }
                backend::msg_type::NO_DATA => {}
                backend::msg_type::CLOSE_COMPLETE => {}
                backend::msg_type::ERROR_RESPONSE => {
                    let err = backend::ErrorResponse::parse(&msg.payload)?;
                    server_error = Some(err.fields);
                }
                backend::msg_type::NOTICE_RESPONSE => {
                    let notice = backend::NoticeResponse::parse(&msg.payload)?;
                    debug!(message = notice.message(), "server notice while describing query");
                }
                backend::msg_type::READY_FOR_QUERY => {
                    let rfq = backend::ReadyForQuery::parse(&msg.payload)?;
                    self.transaction_status = rfq.transaction_status().unwrap_or(TransactionStatus::Idle);
                    break;
                }
                other => {
                    return Err(Error::Protocol(format!(
                        "unexpected message {:?} while describing query",
                        other as char
                    )));
                }
            }
        }

        if let Some(fields) = server_error {
            return Err(Error::from_server("<query>", sql, &fields));
        }

        Ok(DescribedQuery { param_oids, columns })
    }

    /// Run a simple-protocol query and collect its rows as raw text/binary bytes.
    /// Used only for catalog lookups (`pg_type`/`pg_enum`/`pg_attribute`).
    pub fn simple_query(&mut self, sql: &str) -> Result<SimpleQueryResult> {
        self.write_buf.clear();
        frontend::write_query(&mut self.write_buf, sql);
        self.flush()?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<Option<Vec<u8>>>> = Vec::new();
        let mut server_error = None;

        loop {
            let msg = self.recv()?;
            match msg.type_byte {
                backend::msg_type::ROW_DESCRIPTION => {
                    let rd = backend::RowDescription::parse(&msg.payload)?;
                    columns = rd.iter().map(|f| f.name.to_string()).collect();
                }
                backend::msg_type::DATA_ROW => {
                    let row = backend::DataRow::parse(&msg.payload)?;
                    rows.push(row.iter().map(|v| v.map(|b| b.to_vec())).collect());
                }
                backend::msg_type::COMMAND_COMPLETE => {}
                backend::msg_type::EMPTY_QUERY_RESPONSE => {}
                backend::msg_type::ERROR_RESPONSE => {
                    let err = backend::ErrorResponse::parse(&msg.payload)?;
                    server_error = Some(err.fields);
                }
                backend::msg_type::NOTICE_RESPONSE => {}
                backend::msg_type::READY_FOR_QUERY => {
                    let rfq = backend::ReadyForQuery::parse(&msg.payload)?;
                    self.transaction_status = rfq.transaction_status().unwrap_or(TransactionStatus::Idle);
                    break;
                }
                other => {
                    return Err(Error::Protocol(format!(
                        "unexpected message {:?} during simple query",
                        other as char
                    )));
                }
            }
        }

        if let Some(fields) = server_error {
            return Err(Error::from_server("<catalog>", sql, &fields));
        }

        Ok(SimpleQueryResult { columns, rows })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.write_buf.clear();
        frontend::write_terminate(&mut self.write_buf);
        let _ = self.writer.write_all(&self.write_buf);
        let _ = self.writer.flush();
    }
}

/// Result of a Parse/Describe/Sync round trip.
#[derive(Debug, Default)]
pub struct DescribedQuery {
    pub param_oids: Vec<crate::protocol::types::Oid>,
    pub columns: Vec<ColumnDescription>,
}

/// One column from a RowDescription.
#[derive(Debug, Clone)]
pub struct ColumnDescription {
    pub name: String,
    pub type_oid: crate::protocol::types::Oid,
    pub table_oid: crate::protocol::types::Oid,
    pub column_id: i16,
}

/// Result of a simple-query round trip: column names plus raw text-format rows.
#[derive(Debug, Default)]
pub struct SimpleQueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<Vec<u8>>>>,
}
