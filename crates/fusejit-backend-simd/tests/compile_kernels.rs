//! End-to-end compilation of fused subgraphs into kernel artifacts.

use fusejit::{
    BroadcastRule, ElementType, FusedSubgraph, OpKind, OperandDescriptor, OperandRef, PartialShape,
};
use fusejit_backend_simd::{
    compile, decode, CompileError, Gpr, Instr, IsaLevel, KernelArtifact, OperandLayout,
    KERNEL_ARTIFACT_VERSION,
};

fn input(element: ElementType, dims: &[usize]) -> OperandDescriptor {
    OperandDescriptor::new(element, PartialShape::from_static(dims.iter().copied()))
}

fn compare_select_chain() -> FusedSubgraph {
    let mut sg = FusedSubgraph::new(vec![
        input(ElementType::F32, &[64]),
        input(ElementType::F32, &[64]),
    ]);
    let mask = sg
        .push(
            OpKind::Less,
            BroadcastRule::Numpy,
            vec![OperandRef::Input(0), OperandRef::Input(1)],
        )
        .unwrap();
    let flipped = sg
        .push(OpKind::LogicalNot, BroadcastRule::Numpy, vec![mask])
        .unwrap();
    sg.push(
        OpKind::Select,
        BroadcastRule::Numpy,
        vec![flipped, OperandRef::Input(0), OperandRef::Input(1)],
    )
    .unwrap();
    sg
}

#[test]
fn chain_compiles_on_every_tier() {
    let sg = compare_select_chain();
    for isa in [IsaLevel::Baseline128, IsaLevel::Wide256, IsaLevel::Wide512] {
        let artifact = compile(&sg, isa).unwrap_or_else(|e| panic!("{}: {e}", isa.name()));
        assert_eq!(artifact.isa, isa);
        assert_eq!(artifact.artifact_version, KERNEL_ARTIFACT_VERSION);
        assert!(decode(&artifact.code).is_ok());
        // The final select produces f32 values.
        assert_eq!(artifact.bindings.output.element, ElementType::F32);
    }
}

#[test]
fn baseline_blend_emulation_grows_the_kernel() {
    let sg = compare_select_chain();
    let narrow = compile(&sg, IsaLevel::Baseline128).unwrap();
    let wide = compile(&sg, IsaLevel::Wide256).unwrap();
    assert!(
        narrow.code.len() > wide.code.len(),
        "emulated blend should take more instructions than native"
    );
}

#[test]
fn identical_constants_share_one_table_slot() {
    // Less, LogicalNot, and Select all request the f32 1.0 "true" pattern.
    let sg = compare_select_chain();
    let artifact = compile(&sg, IsaLevel::Wide256).unwrap();
    assert_eq!(artifact.constant_table.len(), 1);
    let entry = &artifact.constant_table[0];
    assert_eq!(entry.pattern, 0x3f80_0000);
    assert_eq!(entry.offset, 0);
    assert_eq!(artifact.constant_bytes, 1.0f32.to_le_bytes().to_vec());

    // The table pointer is set up exactly once, at the top of the kernel.
    let instrs = decode(&artifact.code).unwrap();
    let setups = instrs
        .iter()
        .filter(|i| matches!(i, Instr::LoadTableBase { .. }))
        .count();
    assert_eq!(setups, 1);
    assert!(matches!(instrs[0], Instr::LoadTableBase { .. }));
}

#[test]
fn table_free_kernel_reserves_no_table_base() {
    let mut sg = FusedSubgraph::new(vec![
        input(ElementType::F32, &[16]),
        input(ElementType::F32, &[16]),
    ]);
    sg.push(
        OpKind::Add,
        BroadcastRule::Numpy,
        vec![OperandRef::Input(0), OperandRef::Input(1)],
    )
    .unwrap();
    let artifact = compile(&sg, IsaLevel::Baseline128).unwrap();
    assert!(artifact.constant_table.is_empty());
    assert!(artifact.constant_bytes.is_empty());
    let instrs = decode(&artifact.code).unwrap();
    assert!(!instrs
        .iter()
        .any(|i| matches!(i, Instr::LoadTableBase { .. })));
}

#[test]
fn dead_input_registers_are_reused() {
    let mut sg = FusedSubgraph::new(vec![
        input(ElementType::F32, &[16]),
        input(ElementType::F32, &[16]),
    ]);
    let sum = sg
        .push(
            OpKind::Add,
            BroadcastRule::Numpy,
            vec![OperandRef::Input(0), OperandRef::Input(1)],
        )
        .unwrap();
    let prod = sg
        .push(
            OpKind::Multiply,
            BroadcastRule::Numpy,
            vec![sum, OperandRef::Input(0)],
        )
        .unwrap();
    sg.push(OpKind::Sqrt, BroadcastRule::Numpy, vec![prod])
        .unwrap();

    let artifact = compile(&sg, IsaLevel::Baseline128).unwrap();
    let instrs = decode(&artifact.code).unwrap();
    let mut max_reg = 0u8;
    for instr in &instrs {
        if let Instr::Bin { dst, a, b, .. } = instr {
            max_reg = max_reg.max(dst.0).max(a.0).max(b.0);
        }
    }
    // Three values are never live at once, so the plan stays within four
    // registers even though five values exist across the kernel.
    assert!(max_reg < 4, "used register v{max_reg}");
}

#[test]
fn scalar_operand_is_splatted_not_vector_loaded() {
    let mut sg = FusedSubgraph::new(vec![
        input(ElementType::F32, &[64]),
        input(ElementType::F32, &[1]),
    ]);
    sg.push(
        OpKind::Add,
        BroadcastRule::Numpy,
        vec![OperandRef::Input(0), OperandRef::Input(1)],
    )
    .unwrap();

    let artifact = compile(&sg, IsaLevel::Wide256).unwrap();
    assert_eq!(artifact.bindings.inputs[0].layout, OperandLayout::Vector);
    assert_eq!(artifact.bindings.inputs[1].layout, OperandLayout::ScalarSplat);

    // The size-1 buffer is read as a broadcast scalar, never as a full
    // vector at its pointer.
    let instrs = decode(&artifact.code).unwrap();
    assert!(instrs
        .iter()
        .any(|i| matches!(i, Instr::LoadSplat { base: Gpr(1), .. })));
    assert!(!instrs
        .iter()
        .any(|i| matches!(i, Instr::LoadVec { base: Gpr(1), .. })));
}

#[test]
fn strided_broadcast_is_rejected_at_compile_time() {
    // [4] broadcasts onto [2, 4] only with a periodic load pattern, which
    // the kernel format cannot express.
    let mut sg = FusedSubgraph::new(vec![
        input(ElementType::F32, &[2, 4]),
        input(ElementType::F32, &[4]),
    ]);
    sg.push(
        OpKind::Add,
        BroadcastRule::Numpy,
        vec![OperandRef::Input(0), OperandRef::Input(1)],
    )
    .unwrap();

    let err = compile(&sg, IsaLevel::Wide256).expect_err("no layout for a strided input");
    assert!(matches!(
        err,
        CompileError::UnsupportedBroadcast { input: 1, .. }
    ));
}

#[test]
fn dead_intermediates_release_their_registers() {
    // Twenty unused sums would exhaust a 16-register file if each held its
    // register to the end of the kernel.
    let mut sg = FusedSubgraph::new(vec![
        input(ElementType::F32, &[16]),
        input(ElementType::F32, &[16]),
    ]);
    for _ in 0..20 {
        sg.push(
            OpKind::Add,
            BroadcastRule::Numpy,
            vec![OperandRef::Input(0), OperandRef::Input(1)],
        )
        .unwrap();
    }
    sg.push(
        OpKind::Multiply,
        BroadcastRule::Numpy,
        vec![OperandRef::Input(0), OperandRef::Input(1)],
    )
    .unwrap();

    let artifact = compile(&sg, IsaLevel::Baseline128).unwrap();
    let instrs = decode(&artifact.code).unwrap();
    let mut max_reg = 0u8;
    for instr in &instrs {
        if let Instr::Bin { dst, a, b, .. } = instr {
            max_reg = max_reg.max(dst.0).max(a.0).max(b.0);
        }
    }
    // Two inputs plus one live destination at a time.
    assert!(max_reg < 3, "used register v{max_reg}");
}

#[test]
fn register_exhaustion_is_reported_not_truncated() {
    // Twenty partial sums all stay live until the combine phase, which
    // cannot fit a 16-register file alongside the two inputs.
    let mut sg = FusedSubgraph::new(vec![
        input(ElementType::F32, &[16]),
        input(ElementType::F32, &[16]),
    ]);
    let mut partials = Vec::new();
    for _ in 0..20 {
        partials.push(
            sg.push(
                OpKind::Add,
                BroadcastRule::Numpy,
                vec![OperandRef::Input(0), OperandRef::Input(1)],
            )
            .unwrap(),
        );
    }
    let mut acc = partials[0];
    for &p in &partials[1..] {
        acc = sg
            .push(OpKind::Add, BroadcastRule::Numpy, vec![acc, p])
            .unwrap();
    }

    let err = compile(&sg, IsaLevel::Baseline128).expect_err("16 registers cannot hold 22 values");
    match err {
        CompileError::ResourceExhaustion {
            resource,
            available,
            ..
        } => {
            assert_eq!(resource, "vector");
            assert_eq!(available, 16);
        }
        other => panic!("expected ResourceExhaustion, got {other:?}"),
    }

    // The widest tier has twice the registers and schedules the same graph.
    compile(&sg, IsaLevel::Wide512).unwrap();
}

#[test]
fn gpr_exhaustion_is_reported() {
    // Eight buffer pointers plus the output pointer exceed the eight
    // general-purpose registers.
    let inputs: Vec<OperandDescriptor> =
        (0..8).map(|_| input(ElementType::F32, &[16])).collect();
    let mut sg = FusedSubgraph::new(inputs);
    let mut acc = sg
        .push(
            OpKind::Add,
            BroadcastRule::Numpy,
            vec![OperandRef::Input(0), OperandRef::Input(1)],
        )
        .unwrap();
    for i in 2..8 {
        acc = sg
            .push(
                OpKind::Add,
                BroadcastRule::Numpy,
                vec![acc, OperandRef::Input(i)],
            )
            .unwrap();
    }
    let err = compile(&sg, IsaLevel::Wide512).expect_err("nine pointers need nine gprs");
    assert!(matches!(
        err,
        CompileError::ResourceExhaustion {
            resource: "general-purpose",
            ..
        }
    ));
}

#[test]
fn unsupported_precision_is_rejected() {
    let mut sg = FusedSubgraph::new(vec![
        input(ElementType::F64, &[8]),
        input(ElementType::F64, &[8]),
    ]);
    sg.push(
        OpKind::Add,
        BroadcastRule::Numpy,
        vec![OperandRef::Input(0), OperandRef::Input(1)],
    )
    .unwrap();
    let err = compile(&sg, IsaLevel::Wide256).expect_err("no f64 lowering exists");
    match err {
        CompileError::UnsupportedPrecision { op, element } => {
            assert_eq!(op, "add");
            assert_eq!(element, "FP64");
        }
        other => panic!("expected UnsupportedPrecision, got {other:?}"),
    }
}

#[test]
fn artifact_round_trips_through_bincode() {
    let sg = compare_select_chain();
    let artifact = compile(&sg, IsaLevel::Wide256).unwrap();
    let bytes = bincode::serialize(&artifact).unwrap();
    let restored: KernelArtifact = bincode::deserialize(&bytes).unwrap();
    assert_eq!(restored, artifact);
}

#[test]
fn is_inf_variants_request_matching_constants() {
    for (neg, pos, expected_patterns) in [
        (true, true, vec![0x7fff_ffffu32, 0x7f80_0000, 0x3f80_0000]),
        (false, true, vec![0x7f80_0000, 0x3f80_0000]),
        (true, false, vec![0xff80_0000, 0x3f80_0000]),
        (false, false, vec![0x0000_0000]),
    ] {
        let mut sg = FusedSubgraph::new(vec![input(ElementType::F32, &[8])]);
        sg.push(
            OpKind::IsInf {
                detect_negative: neg,
                detect_positive: pos,
            },
            BroadcastRule::Numpy,
            vec![OperandRef::Input(0)],
        )
        .unwrap();
        let artifact = compile(&sg, IsaLevel::Baseline128).unwrap();
        let patterns: Vec<u32> = artifact
            .constant_table
            .iter()
            .map(|e| e.pattern)
            .collect();
        assert_eq!(patterns, expected_patterns, "neg={neg} pos={pos}");
        assert_eq!(artifact.bindings.output.element, ElementType::Boolean);
    }
}
