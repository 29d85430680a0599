// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end authoring of a realistic rig function against the
//! recording backend.

use rigforge_author::session::{archetypes, RigSession};
use rigforge_author::{BindValue, BinaryOp, FunctionSignature, TransformValue};
use rigforge_graph::{ItemKey, PinPath, PinType, RecordingBackend};

#[test]
fn builds_a_spine_rig() {
    let mut s = RigSession::new(RecordingBackend::new());
    s.declare_member_variable("StretchFactor", PinType::Double, false)
        .unwrap();

    let solve = s
        .start_function(FunctionSignature::new("Solve").mutable())
        .unwrap();

    // Nested helper: defined while Solve is open, call site emitted
    // into Solve when it closes.
    let helper = s
        .start_function(
            FunctionSignature::new("AttachSpine")
                .mutable()
                .input_array("Bones", PinType::ItemKey)
                .input("Stretch", PinType::Double)
                .output("Count", PinType::Int),
        )
        .unwrap();

    let bones = s.input_pin("Bones").unwrap();
    let spline = s
        .spline_from_items(vec![
            ItemKey::bone("spine_01"),
            ItemKey::bone("spine_02"),
            ItemKey::bone("spine_03"),
        ])
        .unwrap();

    s.open_comment_box("per-bone constraints").unwrap();
    let pins = s
        .for_each(BindValue::Pin(bones), PinType::ItemKey)
        .unwrap();

    // Loop body: sample the spline, stamp the sample on the bone.
    let u = s
        .binary_op(
            BinaryOp::Multiply,
            PinType::Double,
            BindValue::Pin(pins.index.clone()),
            BindValue::Float(0.5),
        )
        .unwrap();
    let position = s
        .position_from_spline(BindValue::Pin(spline), BindValue::Pin(u))
        .unwrap();
    s.set_metadata(
        BindValue::Pin(pins.element.clone()),
        "splinePosition",
        PinType::Vector,
        BindValue::Pin(position),
    )
    .unwrap();
    s.go_to_parent_execute().unwrap();
    s.close_comment_box("per-bone constraints", [90, 120, 180])
        .unwrap();

    s.parent_constraint(
        ItemKey::bone("spine_01"),
        vec![ItemKey::control("body_ctrl"), ItemKey::control("hips_ctrl")],
        true,
    )
    .unwrap();
    s.bind_output("Count", BindValue::Int(3)).unwrap();
    s.end_function(true).unwrap();

    // Back in Solve: a rest pose stamped with a transform literal.
    s.declare_local_variable("Offset", PinType::Vector, false)
        .unwrap();
    s.set_variable("Offset", BindValue::Vector([0.0, 10.0, 0.0]))
        .unwrap();
    let rest_pose = s
        .set_metadata(
            BindValue::Item(ItemKey::bone("spine_01")),
            "restPose",
            PinType::Transform,
            BindValue::Transform(TransformValue::from_translation([0.0, 90.0, 0.0])),
        )
        .unwrap();

    // A stretch toggle, then two independent finishing chains.
    s.branch(BindValue::Bool(true)).unwrap();
    s.set_variable("Offset", BindValue::Vector([0.0, 12.0, 0.0]))
        .unwrap();
    s.go_to_parent_execute().unwrap();
    s.set_variable("Offset", BindValue::Vector([0.0, 8.0, 0.0]))
        .unwrap();
    s.go_to_parent_execute().unwrap();

    s.sequence().unwrap();
    let first = s.sequence_plug().unwrap();
    s.parent_constraint(
        ItemKey::bone("spine_03"),
        vec![ItemKey::control("chest_ctrl")],
        false,
    )
    .unwrap();
    let second = s.sequence_plug().unwrap();
    s.set_variable("Offset", BindValue::Vector([0.0, 0.0, 0.0]))
        .unwrap();
    s.end_sequence().unwrap();
    assert_eq!((first.as_str(), second.as_str()), ("A", "B"));

    s.end_function(false).unwrap();

    let backend = s.into_backend();

    // Helper signature was exposed on the library function.
    let function = backend.function(helper).unwrap();
    assert_eq!(function.name, "AttachSpine");
    assert!(function.mutable);
    assert_eq!(function.exposed_pins.len(), 3);
    assert_eq!(function.exposed_pins[0].2, "ItemKey");
    assert!(function.exposed_pins[0].3, "Bones is exposed as an array");

    // The loop's wildcard pins were resolved before binding.
    let (for_each, _) = backend
        .nodes()
        .find(|(_, node)| node.archetype == archetypes::FOR_EACH)
        .unwrap();
    assert_eq!(
        backend.resolved_type(&PinPath::root(for_each, "Array")),
        Some("Array<ItemKey>")
    );
    assert_eq!(
        backend.resolved_type(&PinPath::root(for_each, "Element")),
        Some("ItemKey")
    );

    // The spline input was resized then filled element by element.
    let (spline_node, _) = backend
        .nodes()
        .find(|(_, node)| node.archetype == archetypes::SPLINE_FROM_ITEMS)
        .unwrap();
    let items = PinPath::root(spline_node, "Items");
    assert_eq!(backend.array_size(&items), Some(3));
    assert_eq!(
        backend.default_of(&items.element(1).child("Name")),
        Some("spine_02")
    );
    assert_eq!(
        backend.default_of(&items.element(1).child("Type")),
        Some("Bone")
    );

    // One comment box was emitted.
    assert_eq!(backend.comments().len(), 1);
    assert_eq!(backend.comments()[0].text, "per-bone constraints");

    // The helper's call site is the first node in Solve's chain.
    let entry = PinPath::root(solve, "Entry").child("ExecuteContext");
    let call = backend
        .links()
        .iter()
        .find(|(source, _)| *source == entry)
        .map(|(_, target)| target.node)
        .unwrap();
    assert_eq!(
        backend.node(call).unwrap().archetype,
        archetypes::function_call("AttachSpine")
    );

    // ...and Solve's final cursor reached its return node.
    let return_exec = PinPath::root(solve, "Return").child("ExecuteContext");
    assert!(backend
        .links()
        .iter()
        .any(|(_, target)| *target == return_exec));

    // The helper's Count output got its literal.
    assert_eq!(
        backend.default_of(&PinPath::root(helper, "Return").child("Count")),
        Some("3")
    );

    // Transform literal landed component-wise under the metadata value.
    let value = PinPath::root(rest_pose, "Value");
    assert_eq!(backend.resolved_type(&value), Some("Transform"));
    assert_eq!(
        backend.default_of(&value.child("Translation").child("Y")),
        Some("90.000000")
    );
    assert_eq!(
        backend.default_of(&value.child("Scale").child("Z")),
        Some("1.000000")
    );
    assert!(backend.is_expanded(&value));
}

#[test]
fn parallel_sessions_do_not_share_state() {
    let mut a = RigSession::new(RecordingBackend::new());
    let mut b = RigSession::new(RecordingBackend::new());

    a.start_function(FunctionSignature::new("Solve").mutable())
        .unwrap();
    // Session b has no open scope; its backend stays untouched.
    assert!(b.set_new_column(1.0).is_err());
    assert_eq!(b.backend().call_count(), 0);
    assert!(a.backend().call_count() > 0);
}
