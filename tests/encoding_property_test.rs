//! Property tests for the instruction payload codec

use proptest::prelude::*;
use task_coordinator_client::tx_builder::{decode, encode, Field, FieldSet, Opcode, Operation};

fn field_value() -> impl Strategy<Value = String> {
    // Up to 60 chars of up to 4 bytes each stays under the 255 byte limit
    "\\PC{1,60}"
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (field_value(), field_value(), field_value()).prop_map(|(node_id, ip_address, hardware_id)| {
            Operation::RegisterNode {
                node_id,
                ip_address,
                hardware_id,
            }
        }),
        field_value().prop_map(|node_id| Operation::RemoveNode { node_id }),
        (field_value(), field_value())
            .prop_map(|(node_id, task_id)| Operation::DispatchTask { node_id, task_id }),
        (field_value(), field_value(), field_value()).prop_map(|(node_id, task_id, answer_data)| {
            Operation::ReturnAnswer {
                node_id,
                task_id,
                answer_data,
            }
        }),
        field_value().prop_map(|node_id| Operation::StartSession { node_id }),
        field_value().prop_map(|node_id| Operation::EndSession { node_id }),
    ]
}

proptest! {
    #[test]
    fn operation_survives_decode(op in operation()) {
        let payload = op.encode().unwrap();
        prop_assert_eq!(Operation::decode(&payload).unwrap(), op);
    }

    #[test]
    fn payload_length_is_prefix_plus_fields(op in operation()) {
        let payload = op.encode().unwrap();
        let fields = op.fields();
        let expected: usize = 4 + fields
            .present()
            .iter()
            .map(|f| 1 + fields.get(*f).unwrap_or_default().len())
            .sum::<usize>();
        prop_assert_eq!(payload.len(), expected);
        prop_assert_eq!(&payload[..4], &op.opcode().as_u32().to_le_bytes()[..]);
    }

    #[test]
    fn raw_opcode_is_little_endian(opcode in any::<u32>(), node_id in field_value()) {
        let fields = FieldSet::new().with(Field::NodeId, node_id.clone());
        let payload = encode(opcode, &fields).unwrap();
        prop_assert_eq!(&payload[..4], &opcode.to_le_bytes()[..]);

        let (decoded_opcode, decoded) = decode(&payload, &[Field::NodeId]).unwrap();
        prop_assert_eq!(decoded_opcode, opcode);
        prop_assert_eq!(decoded.get(Field::NodeId), Some(node_id.as_str()));
    }

    #[test]
    fn any_field_subset_survives_decode(
        opcode in any::<u32>(),
        node_id in prop::option::of(field_value()),
        task_id in prop::option::of(field_value()),
        ip_address in prop::option::of(field_value()),
        hardware_id in prop::option::of(field_value()),
        answer_data in prop::option::of(field_value()),
    ) {
        let fields = FieldSet {
            node_id,
            task_id,
            ip_address,
            hardware_id,
            answer_data,
        };
        let payload = encode(opcode, &fields).unwrap();

        let (decoded_opcode, decoded) = decode(&payload, &fields.present()).unwrap();
        prop_assert_eq!(decoded_opcode, opcode);
        prop_assert_eq!(decoded, fields);
    }

    #[test]
    fn oversized_field_is_rejected(len in 256usize..600) {
        let fields = FieldSet::new().with(Field::AnswerData, "a".repeat(len));
        prop_assert!(encode(Opcode::ReturnAnswer.as_u32(), &fields).is_err());
    }
}
