//! Request dispatch and event fan-out.
//!
//! One inbound text frame is parsed, dispatched to its handler, and any
//! resulting events are pushed onto the recipients' channel queues before
//! the handler returns. Protected requests from a channel with no bound
//! identity are dropped without a reply (minimal-disclosure behavior;
//! `register` is the one exception and answers with the permission error).
//! A handler fault never closes the channel or the server.

use tracing::{debug, info, warn};

use {
    intrachat_directory::Account,
    intrachat_protocol::{
        ClientRequest, CreateGroupParams, GroupSummary, Inbound, JoinGroupParams, LoginParams,
        ParticipantRef, RegisterParams, SendMessageParams, ServerEvent, StartConversationParams,
        parse_frame,
    },
};

use crate::{presence::ConnectionRegistry, state::GatewayState};

/// Entry point for one inbound text frame from `conn_id`.
pub async fn handle_text(state: &GatewayState, conn_id: &str, text: &str) {
    match parse_frame(text) {
        Ok(Inbound::Request(request)) => {
            debug!(kind = request.kind(), conn_id, "dispatching request");
            dispatch(state, conn_id, request).await;
        },
        Ok(Inbound::Legacy) => {
            // Unrecognized type: relay the raw frame to every connected
            // channel (legacy chat compatibility).
            debug!(conn_id, "relaying legacy frame");
            state.presence.read().await.broadcast_all(text);
        },
        Err(e) => {
            // Logged and swallowed; the channel stays open and gets no
            // feedback.
            warn!(conn_id, error = %e, "malformed frame");
        },
    }
}

async fn dispatch(state: &GatewayState, conn_id: &str, request: ClientRequest) {
    match request {
        ClientRequest::Login(params) => handle_login(state, conn_id, params).await,
        ClientRequest::Register(params) => handle_register(state, conn_id, params).await,
        ClientRequest::GetUsers => handle_get_users(state, conn_id).await,
        ClientRequest::StartConversation(params) => {
            handle_start_conversation(state, conn_id, params).await
        },
        ClientRequest::SendMessage(params) => handle_send_message(state, conn_id, params).await,
        ClientRequest::CreateGroup(params) => handle_create_group(state, conn_id, params).await,
        ClientRequest::JoinGroup(params) => handle_join_group(state, conn_id, params).await,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// The identity bound to this channel, if any.
async fn identity(state: &GatewayState, conn_id: &str) -> Option<String> {
    state
        .presence
        .read()
        .await
        .identity_of(conn_id)
        .map(str::to_string)
}

/// Encode and send one event to the requesting channel.
async fn reply(state: &GatewayState, conn_id: &str, event: &ServerEvent) {
    let Some(frame) = encode(event) else { return };
    state.presence.read().await.send_to_conn(conn_id, &frame);
}

fn encode(event: &ServerEvent) -> Option<String> {
    match event.encode() {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(error = %e, "failed to encode event");
            None
        },
    }
}

/// Push a frame to every listed participant that is online. Offline
/// participants are skipped silently; duplicates in the list get the frame
/// once per occurrence.
fn fan_out(presence: &ConnectionRegistry, participants: &[String], frame: &str) {
    for cpf in participants {
        if let Some(sender) = presence.resolve(cpf) {
            let _ = sender.send(frame.to_string());
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn handle_login(state: &GatewayState, conn_id: &str, params: LoginParams) {
    let verified = {
        let directory = state.directory.read().await;
        directory.verify_credentials(&params.cpf, &params.senha)
    };
    match verified {
        Ok(account) => {
            state.presence.write().await.bind(&account.cpf, conn_id);
            info!(cpf = %account.cpf, nome = %account.nome, "login");
            reply(state, conn_id, &ServerEvent::LoginSuccess {
                user: account.profile(),
            })
            .await;
        },
        Err(e) => {
            reply(state, conn_id, &ServerEvent::LoginError {
                message: e.to_string(),
            })
            .await;
        },
    }
}

async fn handle_register(state: &GatewayState, conn_id: &str, params: RegisterParams) {
    let requester = identity(state, conn_id).await;
    let result = {
        let mut directory = state.directory.write().await;
        directory.register(
            Account {
                cpf: params.cpf,
                senha: params.senha,
                nome: params.nome,
                setor: params.setor,
                cargo: params.cargo,
            },
            requester.as_deref(),
        )
    };
    let event = match result {
        Ok(_) => ServerEvent::RegisterSuccess {
            message: "Usuário cadastrado com sucesso".into(),
        },
        Err(e) => ServerEvent::RegisterError {
            message: e.to_string(),
        },
    };
    reply(state, conn_id, &event).await;
}

async fn handle_get_users(state: &GatewayState, conn_id: &str) {
    let Some(cpf) = identity(state, conn_id).await else {
        return;
    };
    let entries = {
        let directory = state.directory.read().await;
        let presence = state.presence.read().await;
        directory.list_others(&cpf, |key| presence.is_online(key))
    };
    reply(state, conn_id, &ServerEvent::UsersList(entries)).await;
}

async fn handle_start_conversation(
    state: &GatewayState,
    conn_id: &str,
    params: StartConversationParams,
) {
    let Some(cpf) = identity(state, conn_id).await else {
        return;
    };
    // Target must be a registered account; otherwise the request is
    // dropped without a reply.
    let Some(target) = ({
        let directory = state.directory.read().await;
        directory.get(&params.target_cpf).map(Account::peer)
    }) else {
        return;
    };

    let (conversation_id, messages) = {
        let mut rooms = state.rooms.write().await;
        let conversation = rooms.get_or_create_direct(&cpf, &params.target_cpf);
        (conversation.id.clone(), conversation.messages.clone())
    };
    reply(state, conn_id, &ServerEvent::ConversationStarted {
        conversation_id,
        target_user: target,
        messages,
    })
    .await;
}

async fn handle_send_message(state: &GatewayState, conn_id: &str, params: SendMessageParams) {
    let Some(cpf) = identity(state, conn_id).await else {
        return;
    };
    let sender = {
        let directory = state.directory.read().await;
        match directory.get(&cpf) {
            Some(account) => account.participant(),
            None => return,
        }
    };

    // The rooms guard is held across the fan-out so that, per room,
    // recipients see appends in append order (sends below are
    // non-blocking queue pushes).
    let mut rooms = state.rooms.write().await;
    let message = rooms.compose_message(sender, params.content);
    let id = &params.conversation_id;
    let delivery = if params.is_group && rooms.group(id).is_some() {
        match rooms.append_group(id, message.clone()) {
            Ok(()) => rooms.group(id).map(|group| (group.participants.clone(), true)),
            Err(_) => None,
        }
    } else if rooms.direct(id).is_some() {
        match rooms.append_direct(id, message.clone()) {
            Ok(()) => rooms
                .direct(id)
                .map(|conversation| (conversation.participants.to_vec(), false)),
            Err(_) => None,
        }
    } else {
        // Unknown target: dropped without a reply.
        None
    };
    let Some((participants, is_group)) = delivery else {
        return;
    };

    let event = ServerEvent::NewMessage {
        conversation_id: params.conversation_id.clone(),
        message,
        is_group,
    };
    let Some(frame) = encode(&event) else { return };
    let presence = state.presence.read().await;
    fan_out(&presence, &participants, &frame);
}

async fn handle_create_group(state: &GatewayState, conn_id: &str, params: CreateGroupParams) {
    let Some(cpf) = identity(state, conn_id).await else {
        return;
    };

    let members: Vec<String> = std::iter::once(cpf.clone())
        .chain(params.participants.iter().cloned())
        .collect();
    let refs = participant_refs(state, &members).await;

    let (group_id, name, participants) = {
        let mut rooms = state.rooms.write().await;
        let group = rooms.create_group(&cpf, &params.group_name, params.participants);
        (group.id.clone(), group.name.clone(), group.participants.clone())
    };
    info!(group_id = %group_id, creator = %cpf, "group created");

    let event = ServerEvent::GroupCreated {
        group: GroupSummary {
            id: group_id,
            name,
            participants: refs,
        },
    };
    let Some(frame) = encode(&event) else { return };
    let presence = state.presence.read().await;
    fan_out(&presence, &participants, &frame);
}

async fn handle_join_group(state: &GatewayState, conn_id: &str, params: JoinGroupParams) {
    let Some(_cpf) = identity(state, conn_id).await else {
        return;
    };
    // Snapshot only: joining never alters the membership list.
    let Some((name, messages, members)) = ({
        let rooms = state.rooms.read().await;
        rooms.group(&params.group_id).map(|group| {
            (
                group.name.clone(),
                group.messages.clone(),
                group.participants.clone(),
            )
        })
    }) else {
        return;
    };
    let participants = participant_refs(state, &members).await;
    reply(state, conn_id, &ServerEvent::GroupJoined {
        group_id: params.group_id,
        group_name: name,
        messages,
        participants,
    })
    .await;
}

/// `{cpf, nome}` for each listed key, in order and with duplicates kept.
/// A key with no account keeps the cpf as its display name (membership is
/// never validated at creation, so unknown keys are possible here).
async fn participant_refs(state: &GatewayState, cpfs: &[String]) -> Vec<ParticipantRef> {
    let directory = state.directory.read().await;
    cpfs.iter()
        .map(|cpf| match directory.get(cpf) {
            Some(account) => account.participant(),
            None => ParticipantRef {
                cpf: cpf.clone(),
                nome: cpf.clone(),
            },
        })
        .collect()
}
