use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cryoflow_meta::{parse_document, parse_filename, MetadataExtractor};

// Typical EPU micrograph document, trimmed to the extracted sections
const EPU_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<MicroscopeImage xmlns="http://schemas.datacontract.org/2004/07/Fei.SharedObjects" xmlns:i="http://www.w3.org/2001/XMLSchema-instance">
    <CustomData xmlns:a="http://schemas.microsoft.com/2003/10/Serialization/Arrays">
        <a:KeyValueOfstringanyType><a:Key>Dose</a:Key><a:Value>2.4E+21</a:Value></a:KeyValueOfstringanyType>
        <a:KeyValueOfstringanyType><a:Key>PhasePlateUsed</a:Key><a:Value>false</a:Value></a:KeyValueOfstringanyType>
        <a:KeyValueOfstringanyType><a:Key>DetectorCommercialName</a:Key><a:Value>Falcon 3</a:Value></a:KeyValueOfstringanyType>
        <a:KeyValueOfstringanyType>
            <a:Key>FractionationSettings</a:Key>
            <a:Value xmlns:b="urn:fractions">
                <b:Fractions>
                    <b:DoseFractionDefinition><b:EndFrameNumber>2</b:EndFrameNumber><b:StartFrameNumber>0</b:StartFrameNumber></b:DoseFractionDefinition>
                    <b:DoseFractionDefinition><b:EndFrameNumber>5</b:EndFrameNumber><b:StartFrameNumber>3</b:StartFrameNumber></b:DoseFractionDefinition>
                </b:Fractions>
            </a:Value>
        </a:KeyValueOfstringanyType>
    </CustomData>
    <microscopeData>
        <acquisition>
            <acquisitionDateTime>2018-05-30T02:21:14.5+02:00</acquisitionDateTime>
            <camera>
                <Binning xmlns:a="http://schemas.datacontract.org/2004/07/System.Drawing"><a:x>1</a:x><a:y>1</a:y></Binning>
                <ExposureTime>7.9</ExposureTime>
                <ReadoutArea xmlns:a="http://schemas.datacontract.org/2004/07/System.Drawing"><a:height>4096</a:height><a:width>4096</a:width></ReadoutArea>
            </camera>
        </acquisition>
        <gun><AccelerationVoltage>300000</AccelerationVoltage></gun>
        <optics>
            <BeamShift xmlns:a="http://schemas.datacontract.org/2004/07/System.Drawing"><a:_x>0.011</a:_x><a:_y>-0.023</a:_y></BeamShift>
            <BeamTilt xmlns:a="http://schemas.datacontract.org/2004/07/System.Drawing"><a:_x>0.0</a:_x><a:_y>0.0</a:_y></BeamTilt>
            <Defocus>-1.5E-06</Defocus>
            <Intensity>0.4478</Intensity>
            <SpotIndex>5</SpotIndex>
        </optics>
        <stage>
            <Position><A>0.0012</A><B>0</B><X>-3.1E-05</X><Y>0.00021</Y><Z>-7.4E-06</Z></Position>
        </stage>
    </microscopeData>
    <SpatialScale>
        <pixelSize>
            <x><numericValue>1.1E-10</numericValue></x>
            <y><numericValue>1.1E-10</numericValue></y>
        </pixelSize>
    </SpatialScale>
</MicroscopeImage>"#;

const MOVIE_PATH: &str = "/data/session/Images-Disc1/GridSquare_123/Data/FoilHole_28385656_Data_28397105_28397106_20180530_0221_Fractions.mrc";

fn bench_tree(c: &mut Criterion) {
    c.bench_function("parse_document", |b| {
        b.iter(|| parse_document(black_box(EPU_XML.as_bytes())))
    });
}

fn bench_extract(c: &mut Criterion) {
    let extractor = MetadataExtractor::epu();
    let mut group = c.benchmark_group("extract");

    for copies in [1usize, 10, 100] {
        let documents: Vec<&[u8]> = std::iter::repeat(EPU_XML.as_bytes()).take(copies).collect();
        group.bench_with_input(BenchmarkId::from_parameter(copies), &documents, |b, docs| {
            b.iter(|| {
                for doc in docs {
                    let _ = black_box(extractor.extract(black_box(doc)));
                }
            })
        });
    }

    group.finish();
}

fn bench_filename(c: &mut Criterion) {
    c.bench_function("parse_filename", |b| {
        b.iter(|| parse_filename(black_box(MOVIE_PATH)))
    });
}

criterion_group!(benches, bench_tree, bench_extract, bench_filename);
criterion_main!(benches);
