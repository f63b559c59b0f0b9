//! End-to-end binding generation from a package description on disk

use cgopy_weld::{
    BindConfig, BindError, BindingBuilder, Decl, HostAbi, Package, TypeExpr, WordSize,
};
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn geo_builder() -> BindingBuilder {
    BindingBuilder::from_json_file(fixture("geo.json"))
        .expect("fixture should parse")
        .word_size(WordSize::W64)
}

#[test]
fn test_build_writes_both_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let output = geo_builder().out_dir(dir.path()).build().unwrap();

    assert_eq!(output.header, dir.path().join("geo.h"));
    assert_eq!(output.source, dir.path().join("geo.c"));

    let header = fs::read_to_string(&output.header).unwrap();
    let source = fs::read_to_string(&output.source).unwrap();

    assert!(header.contains("#ifndef CGOPY_GEO_H\n"));
    assert!(header.ends_with("#endif /* !CGOPY_GEO_H */\n"));
    assert!(source.contains("#include \"geo.h\"\n"));

    // Named types are registered with the module, anonymous ones are not
    assert!(source.contains("PyModule_AddObject(module, \"Point\", (PyObject*)&cpy_type_geo_PointType);"));
    assert!(source.contains("PyModule_AddObject(module, \"Celsius\", (PyObject*)&cpy_type_geo_CelsiusType);"));
    assert!(source.contains("PyModule_AddObject(module, \"Grid\", (PyObject*)&cpy_type_geo_GridType);"));
    assert!(!source.contains("\"*Point\""));

    assert!(source.contains("PyMODINIT_FUNC\nPyInit_geo(void) {\n"));
}

#[test]
fn test_module_surface() {
    let artifacts = geo_builder().generate().unwrap();
    let source = &artifacts.implementation;

    for entry in [
        "{\"NewPoint\", (PyCFunction)cpy_func_geo_NewPoint, METH_VARARGS, \"NewPoint returns a point at (x, y)\"},",
        "{\"Parse\", (PyCFunction)cpy_func_geo_Parse, METH_VARARGS, \"\"},",
        "{\"Dim\", (PyCFunction)cpy_const_geo_Dim, METH_NOARGS, \"\"},",
        "{\"GetScale\", (PyCFunction)cpy_var_geo_Scale_get, METH_NOARGS, \"\"},",
        "{\"SetScale\", (PyCFunction)cpy_var_geo_Scale_set, METH_VARARGS, \"\"},",
    ] {
        assert!(source.contains(entry), "missing module entry {}", entry);
    }

    // Unexported fields get no accessors
    assert!(source.contains("\"X\""));
    assert!(source.contains("\"Y\""));
    assert!(!source.contains("\"label\""));

    // Methods of Point, by value and by pointer
    assert!(source.contains("{\"Norm\", "));
    assert!(source.contains("{\"Scale\", "));

    // Fixed-size numeric arrays expose the buffer protocol
    assert!(source.contains("cpy_type_geo_Grid_tp_as_buffer"));
    assert!(source.contains("cpy_type_geo_Grid_tp_as_sequence"));
}

#[test]
fn test_config_file_drives_the_build() {
    let dir = tempfile::tempdir().unwrap();
    let config = BindConfig::load(fixture("cgopy.toml")).unwrap();
    let output = geo_builder().config(config).out_dir(dir.path()).build().unwrap();

    assert_eq!(output.header.file_name().unwrap(), "geo_bind.h");
    assert_eq!(output.source.file_name().unwrap(), "geo_bind.c");

    let source = fs::read_to_string(&output.source).unwrap();
    assert!(source.contains("#include \"geo_bind.h\"\n"));
    assert!(source.contains("PyMODINIT_FUNC\ninitgeo(void) {\n"));
    assert!(source.contains("Py_InitModule3(\"geo\", cpy_geo_methods, \"Package geo models points on a plane.\");"));
    assert!(!source.contains("PyModuleDef"));
}

#[test]
fn test_abis_differ_only_where_the_runtime_does() {
    let py2 = geo_builder().abi(HostAbi::CPython2).generate().unwrap();
    let py3 = geo_builder().abi(HostAbi::CPython3).generate().unwrap();

    assert_eq!(py2.declarations.lines().next(), py3.declarations.lines().next());
    assert!(py2.implementation.contains("PyObject_HEAD_INIT(NULL)"));
    assert!(py3.implementation.contains("PyVarObject_HEAD_INIT(NULL, 0)"));
    assert!(py2.implementation.contains("Py_TPFLAGS_HAVE_NEWBUFFER"));
    assert!(!py3.implementation.contains("Py_TPFLAGS_HAVE_NEWBUFFER"));
    assert!(py2.implementation.contains("->ob_type->tp_free("));
    assert!(py3.implementation.contains("Py_TYPE(self)->tp_free("));
}

#[test]
fn test_generation_is_deterministic() {
    let first = geo_builder().generate().unwrap();
    let second = geo_builder().generate().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unresolvable_type_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("bindings");
    let pkg = Package::new("broken").decl(Decl::var("V", TypeExpr::named("Missing")));

    let err = BindingBuilder::new(pkg).out_dir(&out).build().unwrap_err();
    assert!(matches!(err, BindError::UnresolvableType(ref name) if name == "Missing"));
    assert!(!out.exists());
}

#[test]
fn test_malformed_description() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, "{ \"name\": \"geo\", \"decls\": [ { \"kind\": \"func\" } ] }").unwrap();

    assert!(matches!(
        BindingBuilder::from_json_file(&path),
        Err(BindError::Json(_))
    ));
    assert!(matches!(
        BindingBuilder::from_json_file(dir.path().join("absent.json")),
        Err(BindError::Io { .. })
    ));
}
