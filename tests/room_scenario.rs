//! Room lifecycle scenarios driven through the registry, without sockets.

use room_chat_server::member::Mailbox;
use room_chat_server::message::KICK_NOTICE;
use room_chat_server::{
    Action, Envelope, Identity, Member, Origin, RoomHandle, RoomName, RoomRegistry, SessionId,
    UserId,
};

fn join(room: &RoomHandle, id: u64, name: &str) -> (Origin, Mailbox) {
    let (member, mailbox) = Member::new(Identity::new(UserId(id), name), 10);
    let origin = Origin {
        session: member.id,
        user: UserId(id),
    };
    room.register(member).unwrap();
    (origin, mailbox)
}

#[tokio::test]
async fn test_owner_kicks_after_broadcast() {
    let registry = RoomRegistry::new(10);
    let lobby = registry
        .create(RoomName::parse("lobby1").unwrap(), Some(UserId(42)))
        .unwrap();

    let (seven, mut seven_rx) = join(&lobby, 7, "Seven");
    let (_nine, mut nine_rx) = join(&lobby, 9, "Nine");

    // Client-supplied sender names never survive stamping
    let mut hi = Envelope::new(Action::Broadcast, "hi");
    hi.sender_name = "Nine".to_string();
    lobby.dispatch(seven, hi.stamped("Seven"));

    for rx in [&mut seven_rx, &mut nine_rx] {
        let env = rx.recv().await.unwrap();
        assert_eq!(env.sender_name, "Seven");
        assert_eq!(env.text, "hi");
    }

    // The owner's session does not have to be a member of the room
    let owner = Origin {
        session: SessionId::new(),
        user: UserId(42),
    };
    lobby.dispatch(owner, Envelope::new(Action::Kick, "Nine").stamped("Owner"));

    assert_eq!(nine_rx.recv().await.unwrap().text, KICK_NOTICE);
    assert!(nine_rx.recv().await.is_none());
    assert_eq!(lobby.members().await.unwrap(), vec!["Seven"]);
}

#[tokio::test]
async fn test_close_through_registry_empties_room() {
    let registry = RoomRegistry::new(10);
    let name = RoomName::parse("lobby1").unwrap();
    let lobby = registry.create(name.clone(), Some(UserId(42))).unwrap();

    let (seven, mut seven_rx) = join(&lobby, 7, "Seven");
    let (_nine, mut nine_rx) = join(&lobby, 9, "Nine");

    lobby.dispatch(seven, Envelope::new(Action::Broadcast, "bye").stamped("Seven"));
    registry.close_owned(&name, UserId(42)).unwrap();

    // Dispatched before the close, so delivered before the mailbox closes
    for rx in [&mut seven_rx, &mut nine_rx] {
        assert_eq!(rx.recv().await.unwrap().text, "bye");
        assert!(rx.recv().await.is_none());
    }

    // Late events are dropped without effect
    lobby.dispatch(seven, Envelope::new(Action::Broadcast, "late").stamped("Seven"));
    lobby.unregister(seven.session);
    assert!(lobby.members().await.is_none());
    assert!(registry.get(&name).is_none());

    // The name is free again
    assert!(registry.create(name, None).is_ok());
}

#[tokio::test]
async fn test_same_user_in_two_rooms_is_two_members() {
    let registry = RoomRegistry::new(10);
    let a = registry.create(RoomName::parse("a").unwrap(), None).unwrap();
    let b = registry.create(RoomName::parse("b").unwrap(), None).unwrap();

    let (in_a, mut a_rx) = join(&a, 7, "Seven");
    let (_in_b, mut b_rx) = join(&b, 7, "Seven");

    a.dispatch(in_a, Envelope::new(Action::Broadcast, "only a").stamped("Seven"));
    a.members().await.unwrap();
    b.members().await.unwrap();

    assert_eq!(a_rx.recv().await.unwrap().text, "only a");
    assert!(b_rx.try_recv().is_err());
}
