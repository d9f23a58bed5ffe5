//! 查询结构体定义（Query DTO）

use crate::domain::value_object::{CompanyId, SocketId};

/// 按套接字查找连接
#[derive(Debug, Clone)]
pub struct FindConnectionBySocketIdQuery {
    pub socket_id: SocketId,
}

/// 查询在线客服
#[derive(Debug, Clone, Default)]
pub struct FindConnectedCommercialsQuery {
    pub company_id: Option<CompanyId>,
}
