use std::cell::RefCell;

use serde_json::{json, Value};

use super::texture::encode_png;
use super::{
    AssetError, AssetLoader, AssetSource, FileResolver, IndexData, IndexElementWidth,
    LoaderOptions, VirtualFileSet,
};

const POSITIONS: [f32; 9] = [0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 4.0, 0.0];
const NORMALS: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
const TEX_COORDS: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];

/// Records every path it is asked to resolve.
struct CountingResolver {
    files: VirtualFileSet,
    requests: RefCell<Vec<String>>,
}

impl CountingResolver {
    fn new(files: VirtualFileSet) -> Self {
        Self {
            files,
            requests: RefCell::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl FileResolver for CountingResolver {
    fn resolve(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.requests.borrow_mut().push(path.to_string());
        self.files.resolve(path)
    }
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_le_bytes()).collect()
}

/// Triangle buffer: positions, normals, texcoords, then the index payload.
fn triangle_buffer(index_bytes: &[u8]) -> Vec<u8> {
    let mut bytes = f32_bytes(&POSITIONS);
    bytes.extend(f32_bytes(&NORMALS));
    bytes.extend(f32_bytes(&TEX_COORDS));
    bytes.extend_from_slice(index_bytes);
    bytes
}

fn triangle_manifest(uri: &str, index_component: u32, index_bytes: usize) -> Value {
    json!({
        "asset": { "version": "2.0" },
        "buffers": [{ "uri": uri, "byteLength": 96 + index_bytes }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 72, "byteLength": 24 },
            { "buffer": 0, "byteOffset": 96, "byteLength": index_bytes }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2" },
            { "bufferView": 3, "componentType": index_component, "count": 3, "type": "SCALAR" }
        ],
        "meshes": [{
            "name": "triangle",
            "primitives": [{
                "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2 },
                "indices": 3
            }]
        }]
    })
}

fn u16_indices(indices: [u16; 3]) -> Vec<u8> {
    indices.iter().flat_map(|index| index.to_le_bytes()).collect()
}

fn u32_indices(indices: [u32; 3]) -> Vec<u8> {
    indices.iter().flat_map(|index| index.to_le_bytes()).collect()
}

fn manifest_bytes(manifest: &Value) -> Vec<u8> {
    serde_json::to_vec(manifest).unwrap()
}

fn load_files(files: VirtualFileSet, options: LoaderOptions) -> Result<super::Drawable, AssetError> {
    AssetLoader::new(options).load(&AssetSource::Files(files), None)
}

fn triangle_files(index_component: u32, index_bytes: Vec<u8>) -> VirtualFileSet {
    let manifest = triangle_manifest("triangle.bin", index_component, index_bytes.len());
    VirtualFileSet::from_files([
        ("triangle.gltf", manifest_bytes(&manifest)),
        ("triangle.bin", triangle_buffer(&index_bytes)),
    ])
}

#[test]
fn loads_triangle_from_file_set() {
    let drawable = load_files(triangle_files(5123, u16_indices([0, 1, 2])), LoaderOptions::default())
        .unwrap();
    assert_eq!(drawable.name, "triangle");
    assert_eq!(drawable.buffers.position, POSITIONS);
    assert_eq!(drawable.buffers.normal, NORMALS);
    assert_eq!(drawable.buffers.tex_coord.as_deref(), Some(&TEX_COORDS[..]));
    assert_eq!(drawable.buffers.indices, IndexData::U16(vec![0, 1, 2]));
    assert_eq!(drawable.vertex_count(), 3);
    assert!(drawable.texture.is_none());
    assert_eq!(drawable.bounds.center, [1.0, 2.0, 0.0]);
    assert_eq!(drawable.bounds.radius, 2.0);
}

#[test]
fn repeated_loads_are_bit_identical() {
    let files = triangle_files(5125, u32_indices([2, 1, 0]));
    let first = load_files(files.clone(), LoaderOptions::default()).unwrap();
    let second = load_files(files, LoaderOptions::default()).unwrap();
    let bits = |values: &[f32]| values.iter().map(|value| value.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first.buffers.position), bits(&second.buffers.position));
    assert_eq!(bits(&first.buffers.normal), bits(&second.buffers.normal));
    assert_eq!(first.buffers.indices, second.buffers.indices);
    assert_eq!(first.bounds, second.bounds);
}

#[test]
fn empty_meshes_fail_before_any_fetch() {
    let mut manifest = triangle_manifest("triangle.bin", 5123, 6);
    manifest["meshes"] = json!([]);
    let resolver = CountingResolver::new(VirtualFileSet::new());
    let err = AssetLoader::default()
        .load_manifest(&manifest_bytes(&manifest), "scene.gltf", "", &resolver)
        .unwrap_err();
    assert!(matches!(err, AssetError::NoMeshes));
    assert!(resolver.requests().is_empty());
}

#[test]
fn manifest_without_meshes_key_has_no_meshes() {
    let err = AssetLoader::default()
        .load(
            &AssetSource::RawBytes {
                name: Some("empty.gltf".to_string()),
                bytes: b"{\"asset\":{\"version\":\"2.0\"}}".to_vec(),
            },
            None,
        )
        .unwrap_err();
    assert!(matches!(err, AssetError::NoMeshes));
}

#[test]
fn missing_normal_fails_before_any_fetch() {
    let mut manifest = triangle_manifest("triangle.bin", 5123, 6);
    manifest["meshes"][0]["primitives"][0]["attributes"]
        .as_object_mut()
        .unwrap()
        .remove("NORMAL");
    let resolver = CountingResolver::new(VirtualFileSet::new());
    let err = AssetLoader::default()
        .load_manifest(&manifest_bytes(&manifest), "scene.gltf", "", &resolver)
        .unwrap_err();
    match err {
        AssetError::MissingRequiredAttributes { missing } => assert_eq!(missing, vec!["NORMAL"]),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(resolver.requests().is_empty());
}

#[test]
fn signed_32_bit_indices_are_rejected() {
    let manifest = triangle_manifest("triangle.bin", 5124, 12);
    let files = VirtualFileSet::from_files([("triangle.bin", triangle_buffer(&[0; 12]))]);
    let resolver = CountingResolver::new(files);
    let err = AssetLoader::default()
        .load_manifest(&manifest_bytes(&manifest), "scene.gltf", "", &resolver)
        .unwrap_err();
    assert!(matches!(
        err,
        AssetError::UnsupportedComponentType { component_type: 5124 }
    ));
}

#[test]
fn invalid_json_is_a_parse_failure() {
    let files = VirtualFileSet::from_files([("broken.gltf", b"{ not json".to_vec())]);
    let err = load_files(files, LoaderOptions::default()).unwrap_err();
    assert!(matches!(err, AssetError::ManifestParseFailed { .. }));
    assert_eq!(err.kind(), "ManifestParseFailed");
}

#[test]
fn file_set_without_manifest_fails_to_fetch() {
    let files = VirtualFileSet::from_files([("triangle.bin", vec![0; 4])]);
    let err = load_files(files, LoaderOptions::default()).unwrap_err();
    assert!(matches!(err, AssetError::ManifestFetchFailed { .. }));
}

/// `vertex_count` zeroed vertices and one triangle of 32-bit indices.
fn large_mesh_files(vertex_count: usize, indices: [u32; 3]) -> VirtualFileSet {
    let stream_bytes = vertex_count * 12;
    let mut buffer = vec![0u8; stream_bytes * 2];
    buffer.extend(u32_indices(indices));
    let manifest = json!({
        "buffers": [{ "uri": "large.bin", "byteLength": buffer.len() }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": stream_bytes },
            { "buffer": 0, "byteOffset": stream_bytes, "byteLength": stream_bytes },
            { "buffer": 0, "byteOffset": stream_bytes * 2, "byteLength": 12 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": vertex_count, "type": "VEC3" },
            { "bufferView": 1, "componentType": 5126, "count": vertex_count, "type": "VEC3" },
            { "bufferView": 2, "componentType": 5125, "count": 3, "type": "SCALAR" }
        ],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0, "NORMAL": 1 }, "indices": 2 }] }]
    });
    VirtualFileSet::from_files([
        ("large.gltf", manifest_bytes(&manifest)),
        ("large.bin", buffer),
    ])
}

#[test]
fn narrow_u32_indices_become_16_bit() {
    let drawable = load_files(
        large_mesh_files(65536, [0, 1, 65535]),
        LoaderOptions::default(),
    )
    .unwrap();
    assert_eq!(drawable.index_element_width(), IndexElementWidth::U16);
    assert_eq!(drawable.buffers.indices, IndexData::U16(vec![0, 1, 65535]));
}

#[test]
fn wide_u32_indices_fail_without_extended_support() {
    let err = load_files(
        large_mesh_files(70001, [0, 1, 70000]),
        LoaderOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        AssetError::IndexRangeExceeds16Bit { max_index: 70000 }
    ));
}

#[test]
fn extended_indices_keep_u32() {
    let options = LoaderOptions {
        extended_indices: true,
    };
    let drawable = load_files(large_mesh_files(70001, [0, 1, 70000]), options).unwrap();
    assert_eq!(drawable.index_element_width(), IndexElementWidth::U32);
    assert_eq!(drawable.buffers.indices, IndexData::U32(vec![0, 1, 70000]));
}

#[test]
fn index_past_last_vertex_is_rejected() {
    let err = load_files(
        triangle_files(5123, u16_indices([0, 1, 3])),
        LoaderOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        AssetError::IndexOutOfRange {
            max_index: 3,
            vertex_count: 3
        }
    ));
    assert_eq!(err.kind(), "IndexOutOfRange");
}

#[test]
fn u8_indices_are_widened() {
    let drawable =
        load_files(triangle_files(5121, vec![0, 1, 2]), LoaderOptions::default()).unwrap();
    assert_eq!(drawable.buffers.indices, IndexData::U16(vec![0, 1, 2]));
}

#[test]
fn buffers_resolve_relative_to_nested_manifest() {
    let index_bytes = u16_indices([0, 1, 2]);
    let manifest = triangle_manifest("scene.bin", 5123, index_bytes.len());
    let files = VirtualFileSet::from_files([
        ("models/box/scene.gltf", manifest_bytes(&manifest)),
        ("models/box/scene.bin", triangle_buffer(&index_bytes)),
    ]);
    let resolver = CountingResolver::new(files);
    let drawable = AssetLoader::default()
        .load_manifest(
            &manifest_bytes(&manifest),
            "models/box/scene.gltf",
            "models/box",
            &resolver,
        )
        .unwrap();
    assert_eq!(drawable.name, "scene");
    assert_eq!(resolver.requests(), vec!["models/box/scene.bin".to_string()]);
}

#[test]
fn percent_encoded_uri_is_decoded() {
    let index_bytes = u16_indices([0, 1, 2]);
    let manifest = triangle_manifest("my%20mesh.bin", 5123, index_bytes.len());
    let files = VirtualFileSet::from_files([
        ("mesh.gltf", manifest_bytes(&manifest)),
        ("my mesh.bin", triangle_buffer(&index_bytes)),
    ]);
    assert!(load_files(files, LoaderOptions::default()).is_ok());
}

#[test]
fn missing_buffer_reports_attempted_path() {
    let manifest = triangle_manifest("gone.bin", 5123, 6);
    let files = VirtualFileSet::from_files([("dir/mesh.gltf", manifest_bytes(&manifest))]);
    match load_files(files, LoaderOptions::default()).unwrap_err() {
        AssetError::ResourceNotFound { path, known } => {
            assert_eq!(path, "dir/gone.bin");
            assert_eq!(known, vec!["dir/mesh.gltf".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

fn with_base_color_texture(manifest: &mut Value, image: Value) {
    manifest["meshes"][0]["primitives"][0]["material"] = json!(0);
    manifest["materials"] = json!([{
        "name": "paint",
        "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } }
    }]);
    manifest["textures"] = json!([{ "source": 0 }]);
    manifest["images"] = json!([image]);
}

#[test]
fn loads_base_color_texture() {
    let index_bytes = u16_indices([0, 1, 2]);
    let mut manifest = triangle_manifest("triangle.bin", 5123, index_bytes.len());
    with_base_color_texture(&mut manifest, json!({ "uri": "textures/albedo.png" }));
    let files = VirtualFileSet::from_files([
        ("triangle.gltf", manifest_bytes(&manifest)),
        ("triangle.bin", triangle_buffer(&index_bytes)),
        ("textures/albedo.png", encode_png(4, 2, [200, 100, 50, 255])),
    ]);
    let drawable = load_files(files, LoaderOptions::default()).unwrap();
    let texture = drawable.texture.as_ref().unwrap();
    assert_eq!((texture.width, texture.height), (4, 2));
    assert_eq!(&texture.pixels[..4], &[200, 100, 50, 255]);
    assert!(drawable.is_textured());
}

#[test]
fn missing_texture_reports_attempted_path() {
    let index_bytes = u16_indices([0, 1, 2]);
    let mut manifest = triangle_manifest("triangle.bin", 5123, index_bytes.len());
    with_base_color_texture(&mut manifest, json!({ "uri": "albedo.png" }));
    let files = VirtualFileSet::from_files([
        ("assets/triangle.gltf", manifest_bytes(&manifest)),
        ("assets/triangle.bin", triangle_buffer(&index_bytes)),
    ]);
    match load_files(files, LoaderOptions::default()).unwrap_err() {
        AssetError::ResourceNotFound { path, .. } => assert_eq!(path, "assets/albedo.png"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn embedded_image_is_unsupported() {
    let index_bytes = u16_indices([0, 1, 2]);
    let mut manifest = triangle_manifest("triangle.bin", 5123, index_bytes.len());
    with_base_color_texture(&mut manifest, json!({ "name": "baked", "bufferView": 0 }));
    let files = VirtualFileSet::from_files([
        ("triangle.gltf", manifest_bytes(&manifest)),
        ("triangle.bin", triangle_buffer(&index_bytes)),
    ]);
    match load_files(files, LoaderOptions::default()).unwrap_err() {
        AssetError::EmbeddedImageUnsupported { image } => assert_eq!(image, "baked"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn embedded_buffer_is_unsupported() {
    let mut manifest = triangle_manifest("triangle.bin", 5123, 6);
    manifest["buffers"][0] = json!({ "byteLength": 102 });
    let err = AssetLoader::default()
        .load(
            &AssetSource::RawBytes {
                name: None,
                bytes: manifest_bytes(&manifest),
            },
            Some("inline.gltf"),
        )
        .unwrap_err();
    assert!(matches!(err, AssetError::EmbeddedBufferUnsupported { buffer: 0 }));

    manifest["buffers"][0]["uri"] = json!("data:application/octet-stream;base64,AAAA");
    let resolver = CountingResolver::new(VirtualFileSet::new());
    let err = AssetLoader::default()
        .load_manifest(&manifest_bytes(&manifest), "inline.gltf", "", &resolver)
        .unwrap_err();
    assert!(matches!(err, AssetError::EmbeddedBufferUnsupported { buffer: 0 }));
    assert!(resolver.requests().is_empty());
}

#[test]
fn raw_bytes_cannot_resolve_siblings() {
    let manifest = triangle_manifest("triangle.bin", 5123, 6);
    let err = AssetLoader::default()
        .load(
            &AssetSource::RawBytes {
                name: Some("lonely.gltf".to_string()),
                bytes: manifest_bytes(&manifest),
            },
            None,
        )
        .unwrap_err();
    match err {
        AssetError::ResourceNotFound { path, known } => {
            assert_eq!(path, "triangle.bin");
            assert!(known.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn streams_spread_over_several_buffers() {
    let index_bytes = u16_indices([0, 1, 2]);
    let mut manifest = triangle_manifest("geometry.bin", 5123, index_bytes.len());
    manifest["buffers"] = json!([
        { "uri": "geometry.bin", "byteLength": 96 },
        { "uri": "indices.bin", "byteLength": 6 }
    ]);
    manifest["bufferViews"][3] = json!({ "buffer": 1, "byteOffset": 0, "byteLength": 6 });
    let files = VirtualFileSet::from_files([
        ("split.gltf", manifest_bytes(&manifest)),
        ("geometry.bin", triangle_buffer(&[])),
        ("indices.bin", index_bytes),
    ]);
    let resolver = CountingResolver::new(files);
    let drawable = AssetLoader::default()
        .load_manifest(&manifest_bytes(&manifest), "split.gltf", "", &resolver)
        .unwrap();
    assert_eq!(drawable.buffers.indices, IndexData::U16(vec![0, 1, 2]));
    assert_eq!(
        resolver.requests(),
        vec!["geometry.bin".to_string(), "indices.bin".to_string()]
    );
}

#[test]
fn interleaved_stream_honours_stride() {
    // Positions and normals interleaved in a single 24-byte-stride view.
    let mut interleaved = Vec::new();
    for vertex in 0..3 {
        interleaved.extend(f32_bytes(&POSITIONS[vertex * 3..vertex * 3 + 3]));
        interleaved.extend(f32_bytes(&NORMALS[vertex * 3..vertex * 3 + 3]));
    }
    interleaved.extend(u16_indices([0, 1, 2]));
    let manifest = json!({
        "buffers": [{ "uri": "mesh.bin", "byteLength": interleaved.len() }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 72, "byteStride": 24 },
            { "buffer": 0, "byteOffset": 72, "byteLength": 6 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 0, "byteOffset": 12, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0, "NORMAL": 1 }, "indices": 2 }] }]
    });
    let files = VirtualFileSet::from_files([
        ("mesh.gltf", manifest_bytes(&manifest)),
        ("mesh.bin", interleaved),
    ]);
    let drawable = load_files(files, LoaderOptions::default()).unwrap();
    assert_eq!(drawable.buffers.position, POSITIONS);
    assert_eq!(drawable.buffers.normal, NORMALS);
    assert!(drawable.buffers.tex_coord.is_none());
}

#[test]
fn mismatched_normal_count_is_rejected() {
    let index_bytes = u16_indices([0, 1, 2]);
    let mut manifest = triangle_manifest("triangle.bin", 5123, index_bytes.len());
    manifest["accessors"][1]["count"] = json!(2);
    let files = VirtualFileSet::from_files([
        ("triangle.gltf", manifest_bytes(&manifest)),
        ("triangle.bin", triangle_buffer(&index_bytes)),
    ]);
    assert!(matches!(
        load_files(files, LoaderOptions::default()).unwrap_err(),
        AssetError::AttributeCountMismatch {
            attribute: "NORMAL",
            expected: 3,
            actual: 2
        }
    ));
}

#[test]
fn hint_picks_among_several_manifests() {
    let index_bytes = u16_indices([0, 1, 2]);
    let manifest = triangle_manifest("triangle.bin", 5123, index_bytes.len());
    let files = VirtualFileSet::from_files([
        ("a.gltf", b"{ broken".to_vec()),
        ("b.gltf", manifest_bytes(&manifest)),
        ("triangle.bin", triangle_buffer(&index_bytes)),
    ]);
    let drawable = AssetLoader::default()
        .load(&AssetSource::Files(files), Some("b.gltf"))
        .unwrap();
    assert_eq!(drawable.name, "b");
}

fn byte_tex_coord_files(normalized: bool) -> VirtualFileSet {
    let index_bytes = u16_indices([0, 1, 2]);
    let mut buffer = f32_bytes(&POSITIONS);
    buffer.extend(f32_bytes(&NORMALS));
    buffer.extend([0u8, 0, 255, 0, 0, 255]);
    buffer.extend(&index_bytes);
    let mut manifest = triangle_manifest("triangle.bin", 5123, index_bytes.len());
    manifest["buffers"][0]["byteLength"] = json!(buffer.len());
    manifest["bufferViews"][2] = json!({ "buffer": 0, "byteOffset": 72, "byteLength": 6 });
    manifest["bufferViews"][3] = json!({ "buffer": 0, "byteOffset": 78, "byteLength": 6 });
    manifest["accessors"][2] =
        json!({ "bufferView": 2, "componentType": 5121, "normalized": normalized, "count": 3, "type": "VEC2" });
    VirtualFileSet::from_files([
        ("triangle.gltf", manifest_bytes(&manifest)),
        ("triangle.bin", buffer),
    ])
}

#[test]
fn normalized_byte_tex_coords_map_to_unit_range() {
    let drawable = load_files(byte_tex_coord_files(true), LoaderOptions::default()).unwrap();
    assert_eq!(drawable.buffers.tex_coord.as_deref(), Some(&TEX_COORDS[..]));
}

#[test]
fn unnormalized_byte_tex_coords_are_unsupported() {
    let err = load_files(byte_tex_coord_files(false), LoaderOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        AssetError::UnsupportedAttributeFormat {
            attribute: "TEXCOORD_0",
            component_type: 5121,
            ..
        }
    ));
}
