/// Commands a [`SessionHandle`](crate::session::SessionHandle) sends to the session loop.
#[derive(Debug)]
pub enum SessionCommand {
    Close,
}
