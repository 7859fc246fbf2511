//! テスト用のスクリプト化トランスポート
//!
//! `testing` フィーチャー（または単体テスト）でのみ有効。

use crate::transport::{PreparedRequest, RawResponse, Transport, TransportFailure};
use async_trait::async_trait;
use futures::channel::oneshot;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;

type Reply = Result<RawResponse, TransportFailure>;

enum Scripted {
    Ready(Reply),
    Gated(oneshot::Receiver<Reply>),
}

/// 事前に積んだ順にレスポンスを返すモック
///
/// 受け取ったリクエストはすべて記録する。
#[derive(Default)]
pub struct MockTransport {
    replies: RefCell<VecDeque<Scripted>>,
    requests: RefCell<Vec<PreparedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON本文のレスポンスを積む
    pub fn push_json(&self, status: u16, body: Value) {
        self.push_raw(status, body.to_string().into_bytes());
    }

    /// 生の本文のレスポンスを積む
    pub fn push_raw(&self, status: u16, body: Vec<u8>) {
        self.replies
            .borrow_mut()
            .push_back(Scripted::Ready(Ok(RawResponse { status, body })));
    }

    /// 送受信失敗を積む
    pub fn push_failure(&self, failure: TransportFailure) {
        self.replies.borrow_mut().push_back(Scripted::Ready(Err(failure)));
    }

    /// 送信側が値を送るまで待たされるレスポンスを積む
    pub fn push_gate(&self) -> Gate {
        let (sender, receiver) = oneshot::channel();
        self.replies.borrow_mut().push_back(Scripted::Gated(receiver));
        Gate { sender }
    }

    /// 受け取ったリクエスト
    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.borrow().clone()
    }

    /// 最後に受け取ったリクエスト
    pub fn last_request(&self) -> Option<PreparedRequest> {
        self.requests.borrow().last().cloned()
    }

    /// 未使用のレスポンス数
    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

/// `push_gate` で積んだレスポンスを解放する
pub struct Gate {
    sender: oneshot::Sender<Reply>,
}

impl Gate {
    pub fn open_json(self, status: u16, body: Value) {
        let _ = self.sender.send(Ok(RawResponse { status, body: body.to_string().into_bytes() }));
    }

    pub fn fail(self, failure: TransportFailure) {
        let _ = self.sender.send(Err(failure));
    }
}

#[async_trait(?Send)]
impl Transport for MockTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportFailure> {
        self.requests.borrow_mut().push(request);
        let scripted = self.replies.borrow_mut().pop_front();
        match scripted {
            Some(Scripted::Ready(reply)) => reply,
            Some(Scripted::Gated(receiver)) => receiver
                .await
                .unwrap_or_else(|_| Err(TransportFailure::new("gate dropped"))),
            None => Err(TransportFailure::new("no scripted response")),
        }
    }
}
