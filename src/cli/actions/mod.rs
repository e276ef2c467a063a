pub mod server;

#[derive(Debug)]
pub enum Action {
    Server { port: u16, callback_fail_open: bool },
}
